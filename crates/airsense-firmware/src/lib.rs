//! ESP32-C3 firmware-specific modules for airsense
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: UART bring-up from the board table, Wi-Fi association, the
//! embassy-net transport for the cloud client, and shared task state.

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod net;
pub mod serial;
pub mod wifi;
