//! Target state store.
//!
//! Identity from the catalog plus rolling history and derived metrics.

mod history;
mod models;

pub use history::*;
pub use models::*;
