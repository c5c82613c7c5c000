//! Photo records and result pages.

mod types;

pub use types::*;
