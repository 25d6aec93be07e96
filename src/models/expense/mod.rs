pub mod currency;
pub mod preview;
pub mod types;
pub mod validate;

pub use types::*;
