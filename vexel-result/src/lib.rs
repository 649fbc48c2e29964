//! Error types and result definitions for the Vexel aggregation engine.
//!
//! The crate provides a unified error type ([`Error`]) and result type alias
//! ([`Result<T>`]) used throughout all Vexel crates. Every fallible operation
//! returns `Result<T>` and propagates errors upward with the `?` operator.
//!
//! # Error Categories
//!
//! - **Data format errors** ([`Error::Arrow`]): failures reported by Arrow
//!   kernels and builders
//! - **User input errors** ([`Error::InvalidArgumentError`]): unsupported
//!   aggregate/type combinations, missing columns, bad parameters
//! - **Internal errors** ([`Error::Internal`]): bugs or violated invariants

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
