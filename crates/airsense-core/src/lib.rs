//! Hardware-independent core library for airsense
//!
//! This crate contains the platform-agnostic logic for the airsense
//! air-quality monitor: the board pin table, the PMS5003T sensor driver and
//! its corrections, device configuration, and the cloud API client together
//! with the small HTTP/1.1 client it runs on.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-C3) and desktop hosts (for tests).

#![no_std]

extern crate alloc;

pub mod api_client;
pub mod board;
pub mod config;
pub mod device;
pub mod http;
pub mod measurement;
pub mod net;
pub mod sensors;
