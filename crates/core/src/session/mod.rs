//! # Session
//!
//! One linear pass over a project:
//!
//! ```text
//! ensure layout -> update manifest -> generate -> write artifacts -> compile -> test
//! ```
//!
//! Manifest, generation and write failures stop the session with an error.
//! Build and test outcomes are reported, never raised.

pub mod controller;
pub mod report;

pub use controller::Session;
pub use report::SessionReport;
