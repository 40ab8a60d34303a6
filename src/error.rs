//! Unified error type for the supervisor core.
//!
//! A single `Copy` enum that every registration and dispatch path returns.
//! None of these are fatal: the caller logs, drops the offending operation,
//! and the supervisor loop keeps running.

use core::fmt;

/// Every fallible supervisor operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorError {
    /// The adapter table already holds `capacity` adapters.
    RegistrationCapacityExceeded { capacity: usize },
    /// Registration was attempted without an adapter.
    NullAdapter,
    /// A command was submitted against an id nobody registered.
    UnknownCommand,
    /// The command queue is full; the job was dropped.
    QueueFull,
    /// The job's argument copy could not be allocated.
    AllocationFailure,
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistrationCapacityExceeded { capacity } => {
                write!(f, "adapter capacity ({capacity}) exceeded")
            }
            Self::NullAdapter => write!(f, "null adapter"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::QueueFull => write!(f, "command queue full"),
            Self::AllocationFailure => write!(f, "command argument allocation failed"),
        }
    }
}

impl std::error::Error for SupervisorError {}

/// Supervisor-wide `Result` alias.
pub type Result<T> = core::result::Result<T, SupervisorError>;
