//! # Vigil Platform
//!
//! Core platform types for the Vigil SSH agent.
//!
//! This crate provides `VigilError` and `VigilResult`, the error surface
//! the agent reports to its operator (transport I/O, configuration, and
//! key validation failures — protocol errors on the request path never
//! become `VigilError`s; they turn into wire-level failure replies).
//!
//! # Examples
//!
//! ```
//! use vigil_platform::{VigilError, VigilResult};
//!
//! fn example_function() -> VigilResult<String> {
//!     Ok("Hello, Vigil!".to_string())
//! }
//!
//! # fn main() -> VigilResult<()> {
//! let result = example_function()?;
//! assert_eq!(result, "Hello, Vigil!");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;

pub use error::{VigilError, VigilResult};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
