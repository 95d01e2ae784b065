//! Domain layer for Annoscope.
//!
//! Runs, collections and session references, the repository traits through
//! which they are stored, and the compatibility rules that decide which runs
//! may be grouped together.

pub mod collection;
pub mod compat;
pub mod config;
pub mod error;
pub mod query;
pub mod run;
pub mod session;

pub use error::{AnnoError, Result};
