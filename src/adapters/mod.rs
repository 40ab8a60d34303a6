//! Adapters: concrete port implementations and platform adapters.
//!
//! | Adapter   | Implements           | Connects to                 |
//! |-----------|----------------------|-----------------------------|
//! | `nvs`     | StoragePort          | NVS / in-memory store       |
//! |           | ConfigStore          |                             |
//! | `ota`     | OtaPort              | ESP-IDF OTA partition state |
//! | `system`  | SystemPort           | reset reason, `esp_restart` |
//! | `time`    | Clock                | ESP32 high-resolution timer |
//! | `debug`   | Adapter              | serial log                  |
//! | `button`  | Adapter              | GPIO push-button            |

pub mod button;
pub mod debug;
pub mod nvs;
pub mod ota;
pub mod system;
pub mod time;
