//! Platform boundary of the supervisor core.
//!
//! Everything the core needs from the chip (time, persistence, OTA state,
//! reset cause, the status LED) is reached through the **port traits**
//! defined in [`ports`], keeping the loop fully testable without real
//! peripherals.

pub mod ports;
