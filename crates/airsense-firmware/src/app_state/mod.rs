//! Application-wide state and error types for airsense

use airsense_core::sensors::PmsReadings;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use thiserror_no_std::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    WifiConnecting,
    WifiConnected,
    Error,
}

/// State shared between the sensor, Wi-Fi and cloud tasks.
pub struct AppState {
    pub run_state: AppRunState,
    pub wifi_connected: bool,
    /// Latest PMS5003T readings, if a valid frame has been seen.
    pub pms: Option<PmsReadings>,
    pub pms_failed: bool,
}

impl AppState {
    pub const fn new() -> Self {
        Self {
            run_state: AppRunState::Uninitialized,
            wifi_connected: false,
            pms: None,
            pms_failed: false,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub type GlobalStateType = AsyncMutex<CriticalSectionRawMutex, AppState>;

pub static APP_STATE: GlobalStateType = AsyncMutex::new(AppState::new());

#[derive(Error, Debug)]
pub enum AppError {
    #[error("WiFi connection failed: {0}")]
    Wifi(heapless::String<64>),
    #[error("Sensor error: {0}")]
    Sensor(heapless::String<64>),
    #[error("Board error: {0}")]
    Board(heapless::String<64>),
}

impl AppError {
    /// Build an error from anything displayable, truncating long messages.
    pub fn sensor(details: impl core::fmt::Display) -> Self {
        Self::Sensor(truncated(details))
    }

    pub fn board(details: impl core::fmt::Display) -> Self {
        Self::Board(truncated(details))
    }

    pub fn wifi(details: impl core::fmt::Debug) -> Self {
        let mut message = heapless::String::new();
        let _ = core::fmt::write(&mut message, format_args!("{:?}", details));
        Self::Wifi(message)
    }
}

fn truncated<const N: usize>(details: impl core::fmt::Display) -> heapless::String<N> {
    let mut message = heapless::String::new();
    // A full buffer just cuts the message short.
    let _ = core::fmt::write(&mut message, format_args!("{}", details));
    message
}
