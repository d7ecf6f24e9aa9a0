//! # sb-services
//!
//! Orchestration between the catalog, blob storage, and the identifier
//! subsystem. This is where the read-modify-write cycle on the shared
//! JSON catalog gets serialized.

pub mod gallery;
pub mod thumbnails;

pub use gallery::{GalleryService, Page, UpdatePatch};
