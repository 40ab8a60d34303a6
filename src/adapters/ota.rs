//! OTA image self-validation.
//!
//! - **`target_os = "espidf"`**: queries the running partition through
//!   `esp_ota_get_state_partition()` and confirms it with
//!   `esp_ota::mark_app_valid()`.
//! - **`not(target_os = "espidf")`**: a simulated image whose state is set
//!   by the caller (host testing).

use log::{info, warn};

use crate::app::ports::{AppDescription, OtaError, OtaImageState, OtaPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub struct OtaAdapter {
    #[cfg(not(target_os = "espidf"))]
    state: OtaImageState,
}

impl Default for OtaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl OtaAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            state: OtaImageState::Undefined,
        }
    }

    /// Simulated image in the given OTA state.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulated(state: OtaImageState) -> Self {
        Self { state }
    }

    #[cfg(target_os = "espidf")]
    fn map_state(raw: esp_ota_img_states_t) -> OtaImageState {
        #[allow(non_upper_case_globals)]
        match raw {
            esp_ota_img_states_t_ESP_OTA_IMG_NEW => OtaImageState::New,
            esp_ota_img_states_t_ESP_OTA_IMG_PENDING_VERIFY => OtaImageState::PendingVerify,
            esp_ota_img_states_t_ESP_OTA_IMG_VALID => OtaImageState::Valid,
            esp_ota_img_states_t_ESP_OTA_IMG_INVALID => OtaImageState::Invalid,
            esp_ota_img_states_t_ESP_OTA_IMG_ABORTED => OtaImageState::Aborted,
            _ => OtaImageState::Undefined,
        }
    }
}

#[cfg(target_os = "espidf")]
impl OtaPort for OtaAdapter {
    fn running_image_state(&self) -> Result<OtaImageState, OtaError> {
        // SAFETY: returns a pointer into the static partition table.
        let partition = unsafe { esp_ota_get_running_partition() };
        if partition.is_null() {
            return Err(OtaError::NoRunningPartition);
        }
        let mut raw: esp_ota_img_states_t = 0;
        let ret = unsafe { esp_ota_get_state_partition(partition, &mut raw) };
        if ret != ESP_OK {
            return Err(OtaError::StateUnavailable);
        }
        Ok(Self::map_state(raw))
    }

    fn mark_valid_cancel_rollback(&mut self) -> Result<(), OtaError> {
        match esp_ota::mark_app_valid() {
            Ok(()) => {
                info!("OTA: firmware marked valid (rollback cancelled)");
                Ok(())
            }
            Err(e) => {
                warn!("OTA: mark_app_valid failed: {:?}", e);
                Err(OtaError::MarkValidFailed)
            }
        }
    }

    fn running_app_description(&self) -> Option<AppDescription> {
        // SAFETY: the descriptor lives in flash for the lifetime of the app.
        let desc = unsafe { esp_app_get_description().as_ref() }?;
        let field = |raw: &[core::ffi::c_char]| {
            // SAFETY: ESP-IDF NUL-terminates both fields.
            unsafe { core::ffi::CStr::from_ptr(raw.as_ptr()) }
                .to_string_lossy()
                .into_owned()
        };
        Some(AppDescription {
            project_name: field(&desc.project_name),
            version: field(&desc.version),
        })
    }
}

#[cfg(not(target_os = "espidf"))]
impl OtaPort for OtaAdapter {
    fn running_image_state(&self) -> Result<OtaImageState, OtaError> {
        Ok(self.state)
    }

    fn mark_valid_cancel_rollback(&mut self) -> Result<(), OtaError> {
        if self.state != OtaImageState::PendingVerify {
            warn!("OTA (simulation): image not pending verification");
            return Err(OtaError::MarkValidFailed);
        }
        self.state = OtaImageState::Valid;
        info!("OTA (simulation): firmware marked valid");
        Ok(())
    }

    fn running_app_description(&self) -> Option<AppDescription> {
        Some(AppDescription {
            project_name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
        })
    }
}
