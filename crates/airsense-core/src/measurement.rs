//! Telemetry payload posted to the cloud `measures` endpoint

use serde::Serialize;

use crate::sensors::PmsReadings;

/// One measurement report. Keys follow the cloud's JSON schema; readings
/// the device does not have are left out.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm01: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm02: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pm10: Option<u16>,
    #[serde(rename = "pm003Count", skip_serializing_if = "Option::is_none")]
    pub pm003_count: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atmp: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhum: Option<f32>,
    pub boot: u32,
}

impl Measurement {
    pub fn new(boot: u32) -> Self {
        Self {
            boot,
            ..Default::default()
        }
    }

    pub fn with_pms(mut self, readings: &PmsReadings) -> Self {
        self.pm01 = Some(readings.pm01_ae);
        self.pm02 = Some(readings.pm25_ae);
        self.pm10 = Some(readings.pm10_ae);
        self.pm003_count = Some(readings.pm03_particle_count);
        self.atmp = Some(readings.temperature_celsius);
        self.rhum = Some(readings.relative_humidity);
        self
    }

    pub fn with_wifi_rssi(mut self, rssi: i32) -> Self {
        self.wifi = Some(rssi);
        self
    }

    /// Serialize into `buf` and return the JSON text.
    pub fn to_json<'b>(&self, buf: &'b mut [u8]) -> Result<&'b str, serde_json_core::ser::Error> {
        let len = serde_json_core::to_slice(self, buf)?;
        // serde-json-core only emits ASCII.
        core::str::from_utf8(&buf[..len]).map_err(|_| serde_json_core::ser::Error::BufferFull)
    }
}
