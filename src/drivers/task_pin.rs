//! FreeRTOS task placement for supervisor-owned threads.
//!
//! A [`TaskSpec`] names a thread and fixes its core, priority and stack.
//! On ESP-IDF, `std::thread` is a pthread over a FreeRTOS task, and the
//! placement goes through `esp_pthread_set_cfg()`, which only affects the
//! next `pthread_create()` from the calling thread. Spawns from one thread
//! must therefore not interleave.

use std::io;
use std::thread::JoinHandle;

use log::info;

use crate::config::SupervisorConfig;

/// CPU core identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// PRO_CPU, shared with the WiFi/BLE/lwIP stacks.
    Pro = 0,
    /// APP_CPU.
    App = 1,
}

impl Core {
    /// Map a configured core index; anything but 0 selects the APP core.
    pub fn from_index(index: u8) -> Self {
        if index == 0 { Self::Pro } else { Self::App }
    }
}

/// Where and how a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    /// NUL-terminated, e.g. `"supervisor\0"`.
    pub name: &'static str,
    pub core: Core,
    pub priority: u8,
    pub stack_kb: u16,
}

impl TaskSpec {
    /// The supervisor loop task, as configured.
    pub fn supervisor(config: &SupervisorConfig) -> Self {
        Self {
            name: "supervisor\0",
            core: Core::from_index(config.task_core),
            priority: config.task_priority,
            stack_kb: config.task_stack_kb,
        }
    }

    fn label(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }

    fn stack_bytes(&self) -> usize {
        usize::from(self.stack_kb) * 1024
    }

    /// Spawn `f` as this task.
    pub fn spawn(self, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
        self.apply()?;
        info!(
            "Task: spawning '{}' on {:?} (pri={}, stack={}KB)",
            self.label(),
            self.core,
            self.priority,
            self.stack_kb
        );
        std::thread::Builder::new()
            .name(self.label().into())
            .stack_size(self.stack_bytes())
            .spawn(f)
    }

    #[cfg(target_os = "espidf")]
    fn apply(&self) -> io::Result<()> {
        use esp_idf_sys::{ESP_OK, esp_create_default_pthread_config, esp_pthread_set_cfg};

        // SAFETY: `cfg` outlives the call and `name` is 'static.
        let ret = unsafe {
            let mut cfg = esp_create_default_pthread_config();
            cfg.pin_to_core = self.core as i32;
            cfg.prio = i32::from(self.priority);
            cfg.stack_size = self.stack_bytes() as i32;
            cfg.thread_name = self.name.as_ptr().cast();
            esp_pthread_set_cfg(&cfg)
        };
        if ret != ESP_OK as i32 {
            return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
        }
        Ok(())
    }

    /// No core pinning or priorities on the host.
    #[cfg(not(target_os = "espidf"))]
    fn apply(&self) -> io::Result<()> {
        Ok(())
    }
}
