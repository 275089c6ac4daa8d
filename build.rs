use std::env;
use std::fs::read_dir;
use std::fs::DirEntry;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn main() {
    generate_rewrite_tests()
}

const TESTS_DIR: &str = "tests/rewrite";

/// Generate tests cases from files under tests/rewrite/
fn generate_rewrite_tests() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let destination = Path::new(&out_dir).join("rewrite_cases.rs");
    let mut test_file = File::create(&destination).unwrap();

    println!("cargo:rerun-if-changed={}", TESTS_DIR);
    let mut dirents: Vec<DirEntry> = read_dir(TESTS_DIR)
        .unwrap()
        .map(|dirent| dirent.unwrap())
        .collect();
    dirents.sort_by_key(|dirent| dirent.path());

    for dirent in dirents {
        write_test(&mut test_file, &dirent);
    }
}

fn write_test(test_file: &mut File, dirent: &DirEntry) {
    let path = dirent.path();
    let test_name = path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .replace('-', "_")
        .replace('.', "_");

    write!(
        test_file,
        r#"
#[test]
fn {test_name}() {{
    run_test_file(Path::new("{test_path}"));
}}
"#,
        test_name = test_name,
        test_path = path.display()
    )
    .unwrap();
}
