//! Queue-triggered image rendition worker.
//!
//! Reacts to object-storage "created" notifications, stages the new object
//! locally, derives a fixed set of renditions (resized variants plus a
//! watermarked variant) and fans the uploads back out to a destination
//! bucket, isolating failures per artifact.

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;
