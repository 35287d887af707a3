pub mod chain;
pub mod content;
pub mod print;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
