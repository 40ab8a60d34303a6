//! Cikon supervisor runtime library.
//!
//! Exposes the supervisor core (registries, dispatch queue, event fan-out,
//! interval scheduler, safe mode) for integration testing on the host.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod cmnd;
pub mod config;
pub mod error;
pub mod events;
pub mod safe_mode;
pub mod scheduler;
pub mod supervisor;
pub mod tele;

pub mod adapters;
pub mod drivers;

pub use error::{Result, SupervisorError};
