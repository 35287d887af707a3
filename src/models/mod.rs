pub mod common;
pub mod errors;
