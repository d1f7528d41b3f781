//! # Snipdeck Core
//!
//! Runtime-free logic for Snipdeck: page and console models, typed field
//! updates, tag aggregation, search filtering, the pending-write buffer,
//! and the store abstraction.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Timers and real
//! backends live in the `snipdeck` application crate.

pub mod error;
pub mod fields;
pub mod models;
pub mod pending;
pub mod search;
pub mod store;
pub mod tags;

pub use error::{Result, SnipError};
