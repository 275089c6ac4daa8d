mod common;
mod expression;
mod insert;
mod update;

pub use self::common::*;
pub use self::expression::*;
pub use self::insert::*;
pub use self::update::*;
