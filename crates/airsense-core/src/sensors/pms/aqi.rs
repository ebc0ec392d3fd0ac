//! US EPA air quality index for PM2.5
//!
//! Converts a PM2.5 mass concentration into the US AQI scale and groups the
//! result into the EPA's health categories.

/// (concentration low, concentration high, index low, index high)
const BREAKPOINTS: [(f64, f64, f64, f64); 7] = [
    (0.0, 12.0, 0.0, 50.0),
    (12.0, 35.4, 50.0, 100.0),
    (35.4, 55.4, 100.0, 150.0),
    (55.4, 150.4, 150.0, 200.0),
    (150.4, 250.4, 200.0, 300.0),
    (250.4, 350.4, 300.0, 400.0),
    (350.4, 500.4, 400.0, 500.0),
];

const AQI_MAX: u16 = 500;

/// Convert a PM2.5 concentration (ug/m3) into the US AQI.
///
/// Values are interpolated linearly inside the bracket that contains them and
/// truncated; concentrations past the last bracket clamp to 500.
pub fn pm25_to_us_aqi(pm25: u16) -> u16 {
    let pm = pm25 as f64;

    for (c_low, c_high, i_low, i_high) in BREAKPOINTS {
        if pm <= c_high {
            let aqi = (i_high - i_low) / (c_high - c_low) * (pm - c_low) + i_low;
            return aqi as u16;
        }
    }

    AQI_MAX
}

/// Health category for a US AQI value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub const fn from_aqi(aqi: u16) -> Self {
        match aqi {
            0..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthyForSensitiveGroups,
            151..=200 => Self::Unhealthy,
            201..=300 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }

    /// Get the display label for this category
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }
}
