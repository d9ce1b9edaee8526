//! `svckit-core`: error kinds and helpers shared by every svckit crate.
//!
//! No HTTP or database dependencies live here.

pub mod error;
pub mod list;
pub mod validation;

pub use error::{BoxError, HttpError, HttpResult, Kind};
pub use validation::{FieldErrors, Validate};
