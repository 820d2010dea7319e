//! # fxp Platform
//!
//! Core platform types shared across the fxp file-transfer ecosystem.
//!
//! This crate provides:
//! - Unified error types (`FxpError`, `FxpResult`)
//!
//! # Examples
//!
//! ```
//! use fxp_platform::{FxpError, FxpResult};
//!
//! fn example_function() -> FxpResult<String> {
//!     Ok("Hello, fxp!".to_string())
//! }
//!
//! # fn main() -> FxpResult<()> {
//! let result = example_function()?;
//! assert_eq!(result, "Hello, fxp!");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;

pub use error::{FxpError, FxpResult};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
