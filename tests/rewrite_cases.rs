mod utils;

use std::path::Path;

use utils::run_test_file;

include!(concat!(env!("OUT_DIR"), "/rewrite_cases.rs"));
