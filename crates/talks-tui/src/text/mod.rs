//! Text utilities.
//!
//! - [`sanitize`] - Strip escape sequences from untrusted text
//! - [`wrap_indented`] - Text wrapping
//! - [`truncate_to_width`] - Unicode-aware truncation

mod sanitize;
mod width;
mod wrap;

pub use sanitize::sanitize;
pub use width::truncate_to_width;
pub use wrap::wrap_indented;
