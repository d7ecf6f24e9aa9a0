//! shutterbase/crates/sb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Shutterbase.

pub mod error;
pub mod id;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;
