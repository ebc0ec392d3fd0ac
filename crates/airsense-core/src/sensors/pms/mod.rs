//! PMS5003T particulate matter / temperature / humidity sensor
//!
//! The driver owns the UART once [`Pms5003t::begin`] succeeds. Call
//! [`Pms5003t::handle`] from the sensor loop to drain pending bytes; the
//! getters then report values from the latest valid frame.

pub mod aqi;
pub mod frame;

use embassy_time::{Duration, Instant};
use embedded_io::{Read, ReadReady};
use log::{debug, error, info, warn};

use super::SensorError;
use crate::board::{BoardDef, BoardType, SerialPort, UartConfig, board_def};

pub use aqi::{AqiCategory, pm25_to_us_aqi};
pub use frame::{Frame, FrameError, FrameParser};

const SENSOR: &str = "PMS5003T";

/// Without a valid frame for this long the sensor reports itself failed.
pub const FAILURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Empirical correction of the temperature reported by the PMS5003T.
pub fn correct_temperature(celsius: f32) -> f32 {
    if celsius < 10.0 {
        return celsius * 1.327 - 6.738;
    }
    celsius * 1.181 - 5.113
}

/// Empirical correction of the relative humidity reported by the PMS5003T.
pub fn correct_relative_humidity(percent: f32) -> f32 {
    let humidity = percent * 1.259 + 7.34;
    if humidity > 100.0 {
        return 100.0;
    }
    humidity
}

/// Typed snapshot of the latest frame, corrections applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmsReadings {
    pub pm01_ae: u16,
    pub pm25_ae: u16,
    pub pm10_ae: u16,
    pub pm03_particle_count: u16,
    pub temperature_celsius: f32,
    pub relative_humidity: f32,
}

impl From<&Frame> for PmsReadings {
    fn from(frame: &Frame) -> Self {
        Self {
            pm01_ae: frame.pm01_ae,
            pm25_ae: frame.pm25_ae,
            pm10_ae: frame.pm10_ae,
            pm03_particle_count: frame.count_03,
            temperature_celsius: correct_temperature(frame.temperature_raw as f32 / 10.0),
            relative_humidity: correct_relative_humidity(frame.humidity_raw as f32 / 10.0),
        }
    }
}

pub struct Pms5003t<U> {
    board: &'static BoardDef,
    uart: Option<U>,
    parser: FrameParser,
    last_frame: Option<Frame>,
    /// Start of the current wait for a valid frame.
    waiting_since: Option<Instant>,
    failed: bool,
}

impl<U> Pms5003t<U>
where
    U: Read + ReadReady,
{
    pub const fn new(board: BoardType) -> Self {
        Self::with_board_def(board_def(board))
    }

    /// Build a driver for a board that is not in the built-in table.
    pub const fn with_board_def(board: &'static BoardDef) -> Self {
        Self {
            board,
            uart: None,
            parser: FrameParser::new(),
            last_frame: None,
            waiting_since: None,
            failed: false,
        }
    }

    /// UART parameters this sensor needs on `port` for the configured board.
    pub fn uart_config(&self, port: SerialPort) -> Result<UartConfig, SensorError> {
        self.board.pms_uart(port).map_err(|reason| {
            error!("{}", reason);
            SensorError::Unsupported {
                sensor: SENSOR,
                reason,
            }
        })
    }

    /// Initialize the sensor on `port`.
    ///
    /// `open` receives the resolved UART parameters (9600 8N1 on the board's
    /// pins) and returns the opened serial port. Calling `begin` on an
    /// initialized sensor is a no-op.
    pub fn begin<F, E>(&mut self, port: SerialPort, open: F) -> Result<(), SensorError>
    where
        F: FnOnce(&UartConfig) -> Result<U, E>,
        E: core::fmt::Debug,
    {
        if self.uart.is_some() {
            return Ok(());
        }

        let config = self.uart_config(port)?;
        match port {
            SerialPort::Primary => info!("Init Serial"),
            SerialPort::Shared => info!("Init Serialx"),
        }

        let uart = open(&config).map_err(|e| {
            error!("PMS failed: {:?}", e);
            SensorError::InitializationFailed {
                sensor: SENSOR,
                details: "Failed to open UART",
            }
        })?;

        self.uart = Some(uart);
        self.parser.reset();
        self.last_frame = None;
        self.waiting_since = None;
        self.failed = false;
        Ok(())
    }

    /// Release the UART and forget the last readings.
    pub fn end(&mut self) -> Option<U> {
        let uart = self.uart.take()?;
        self.parser.reset();
        self.last_frame = None;
        self.waiting_since = None;
        self.failed = false;
        info!("De-initialize");
        Some(uart)
    }

    pub fn is_begin(&self) -> bool {
        if self.uart.is_none() {
            warn!("Not-initialized");
            return false;
        }
        true
    }

    /// Drain every byte the UART has ready and update the failure state.
    pub fn handle(&mut self, now: Instant) -> Result<(), SensorError> {
        let Some(uart) = self.uart.as_mut() else {
            return Err(SensorError::NotInitialized { sensor: SENSOR });
        };

        let mut buf = [0u8; 64];
        loop {
            let ready = uart.read_ready().map_err(|e| {
                error!("PMS5003T UART poll failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: SENSOR,
                    operation: "poll UART",
                    details: "UART error",
                }
            })?;
            if !ready {
                break;
            }

            let count = uart.read(&mut buf).map_err(|e| {
                error!("PMS5003T UART read failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: SENSOR,
                    operation: "read UART",
                    details: "UART error",
                }
            })?;
            if count == 0 {
                break;
            }

            for &byte in &buf[..count] {
                match self.parser.push(byte) {
                    Some(Ok(frame)) => {
                        debug!("PMS5003T frame: {:?}", frame);
                        self.last_frame = Some(frame);
                        self.waiting_since = Some(now);
                        self.failed = false;
                    }
                    Some(Err(e)) => warn!("PMS5003T dropped frame: {}", e),
                    None => {}
                }
            }
        }

        let since = *self.waiting_since.get_or_insert(now);
        if !self.failed && now.saturating_duration_since(since) > FAILURE_TIMEOUT {
            error!("PMS5003T: no valid frame for {} ms", FAILURE_TIMEOUT.as_millis());
            self.failed = true;
        }

        Ok(())
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// PM1.0 (atmospheric environment, ug/m3) from the last frame.
    pub fn pm01_ae(&self) -> Option<u16> {
        self.last_frame.map(|f| f.pm01_ae)
    }

    /// PM2.5 (atmospheric environment, ug/m3) from the last frame.
    pub fn pm25_ae(&self) -> Option<u16> {
        self.last_frame.map(|f| f.pm25_ae)
    }

    /// PM10 (atmospheric environment, ug/m3) from the last frame.
    pub fn pm10_ae(&self) -> Option<u16> {
        self.last_frame.map(|f| f.pm10_ae)
    }

    /// Particles above 0.3 um per 0.1 L of air.
    pub fn pm03_particle_count(&self) -> Option<u16> {
        self.last_frame.map(|f| f.count_03)
    }

    /// Corrected temperature in degrees Celsius.
    pub fn temperature(&self) -> Option<f32> {
        self.last_frame
            .map(|f| correct_temperature(f.temperature_raw as f32 / 10.0))
    }

    /// Corrected relative humidity in percent.
    pub fn relative_humidity(&self) -> Option<f32> {
        self.last_frame
            .map(|f| correct_relative_humidity(f.humidity_raw as f32 / 10.0))
    }

    pub fn readings(&self) -> Option<PmsReadings> {
        self.last_frame.as_ref().map(PmsReadings::from)
    }

    pub fn convert_pm25_to_us_aqi(&self, pm25: u16) -> u16 {
        pm25_to_us_aqi(pm25)
    }
}

#[cfg(test)]
mod tests {
    use super::frame::tests::{SAMPLE_WORDS, encode};
    use super::*;
    use crate::board::{BoardError, UartSlot};
    use alloc::collections::VecDeque;
    use embedded_io::{ErrorKind, ErrorType};

    /// In-memory UART that hands out queued bytes in small chunks.
    #[derive(Default)]
    struct FakeUart {
        rx: VecDeque<u8>,
    }

    impl FakeUart {
        fn push(&mut self, bytes: &[u8]) {
            self.rx.extend(bytes.iter().copied());
        }
    }

    impl ErrorType for FakeUart {
        type Error = ErrorKind;
    }

    impl ReadReady for FakeUart {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.rx.is_empty())
        }
    }

    impl Read for FakeUart {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let count = buf.len().min(self.rx.len()).min(7);
            for slot in buf.iter_mut().take(count) {
                *slot = self.rx.pop_front().unwrap();
            }
            Ok(count)
        }
    }

    fn started(board: BoardType) -> Pms5003t<FakeUart> {
        let mut pms = Pms5003t::new(board);
        pms.begin(SerialPort::Primary, |_| Ok::<_, ()>(FakeUart::default()))
            .unwrap();
        pms
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_temperature_correction() {
        assert!((correct_temperature(20.0) - 18.507).abs() < 1e-3);
        assert!((correct_temperature(5.0) - (-0.103)).abs() < 1e-3);
        // The low branch applies strictly below 10 degrees.
        assert!((correct_temperature(10.0) - 6.697).abs() < 1e-3);
    }

    #[test]
    fn test_humidity_correction_caps_at_100() {
        assert!((correct_relative_humidity(50.0) - 70.29).abs() < 1e-3);
        assert_eq!(correct_relative_humidity(80.0), 100.0);
    }

    #[test]
    fn test_begin_passes_board_pins() {
        let mut pms: Pms5003t<FakeUart> = Pms5003t::new(BoardType::OpenAirOutdoor);
        let mut seen = None;
        pms.begin(SerialPort::Shared, |config| {
            seen = Some(*config);
            Ok::<_, ()>(FakeUart::default())
        })
        .unwrap();

        let config = seen.unwrap();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!((config.rx_pin, config.tx_pin), (20, 21));
        assert!(pms.is_begin());
    }

    #[test]
    fn test_begin_is_idempotent() {
        let mut pms = started(BoardType::OneIndoor);

        let result = pms.begin(SerialPort::Primary, |_| -> Result<FakeUart, ()> {
            panic!("UART must not be reopened")
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_begin_rejects_unsupported_shared_port() {
        let mut pms: Pms5003t<FakeUart> = Pms5003t::new(BoardType::DiyProIndoorV3_7);

        let result = pms.begin(SerialPort::Shared, |_| Ok::<_, ()>(FakeUart::default()));

        assert_eq!(
            result,
            Err(SensorError::Unsupported {
                sensor: "PMS5003T",
                reason: BoardError::SharedUartUnsupported("diy-pro-indoor-v3-7"),
            })
        );
        assert!(!pms.is_begin());
    }

    #[test]
    fn test_begin_rejects_board_without_pms() {
        static NO_PMS: BoardDef = BoardDef {
            name: "co2-only",
            pms5003: UartSlot {
                rx_pin: 0,
                tx_pin: 0,
                supported: false,
            },
            senseair_s8: UartSlot {
                rx_pin: 3,
                tx_pin: 4,
                supported: true,
            },
        };
        let mut pms: Pms5003t<FakeUart> = Pms5003t::with_board_def(&NO_PMS);

        let result = pms.begin(SerialPort::Primary, |_| Ok::<_, ()>(FakeUart::default()));

        assert!(matches!(result, Err(SensorError::Unsupported { .. })));
    }

    #[test]
    fn test_begin_reports_open_failure() {
        let mut pms: Pms5003t<FakeUart> = Pms5003t::new(BoardType::OneIndoor);

        let result = pms.begin(SerialPort::Primary, |_| Err("busy"));

        assert!(matches!(
            result,
            Err(SensorError::InitializationFailed { .. })
        ));
        assert!(!pms.is_begin());
    }

    #[test]
    fn test_handle_requires_begin() {
        let mut pms: Pms5003t<FakeUart> = Pms5003t::new(BoardType::OneIndoor);

        assert_eq!(
            pms.handle(at(0)),
            Err(SensorError::NotInitialized { sensor: "PMS5003T" })
        );
    }

    #[test]
    fn test_handle_decodes_readings() {
        let mut pms = started(BoardType::OneIndoor);
        assert_eq!(pms.pm25_ae(), None);

        pms.uart.as_mut().unwrap().push(&encode(SAMPLE_WORDS));
        pms.handle(at(100)).unwrap();

        assert_eq!(pms.pm01_ae(), Some(7));
        assert_eq!(pms.pm25_ae(), Some(11));
        assert_eq!(pms.pm10_ae(), Some(14));
        assert_eq!(pms.pm03_particle_count(), Some(1520));
        // 23.5 C raw, 51.2 % raw
        assert!((pms.temperature().unwrap() - 22.6405).abs() < 1e-3);
        assert!((pms.relative_humidity().unwrap() - 71.8008).abs() < 1e-3);
        assert_eq!(pms.convert_pm25_to_us_aqi(pms.pm25_ae().unwrap()), 45);
        assert!(!pms.is_failed());
    }

    #[test]
    fn test_fails_without_frames() {
        let mut pms = started(BoardType::OneIndoor);

        pms.handle(at(1_000)).unwrap();
        pms.handle(at(5_000)).unwrap();
        assert!(!pms.is_failed());

        pms.handle(at(6_100)).unwrap();
        assert!(pms.is_failed());

        // A good frame clears the failure.
        pms.uart.as_mut().unwrap().push(&encode(SAMPLE_WORDS));
        pms.handle(at(6_200)).unwrap();
        assert!(!pms.is_failed());
    }

    #[test]
    fn test_corrupt_frames_do_not_count_as_data() {
        let mut pms = started(BoardType::OneIndoor);
        let mut bad = encode(SAMPLE_WORDS);
        bad[12] ^= 0xFF;

        pms.handle(at(0)).unwrap();
        pms.uart.as_mut().unwrap().push(&bad);
        pms.handle(at(5_500)).unwrap();

        assert_eq!(pms.readings(), None);
        assert!(pms.is_failed());
    }

    #[test]
    fn test_end_releases_uart() {
        let mut pms = started(BoardType::OneIndoor);
        pms.uart.as_mut().unwrap().push(&encode(SAMPLE_WORDS));
        pms.handle(at(0)).unwrap();

        assert!(pms.end().is_some());
        assert!(!pms.is_begin());
        assert_eq!(pms.readings(), None);
        assert!(pms.end().is_none());
    }
}
