//! UART bring-up for serial sensors
//!
//! The board table hands out pin numbers at runtime, so the pins are taken by
//! number rather than through the typed GPIO peripherals.

use airsense_core::board::UartConfig;
use esp_hal::Blocking;
use esp_hal::gpio::AnyPin;
use esp_hal::uart::{self, DataBits, Parity, StopBits, Uart};
use log::info;

/// Open `uart` with the 8N1 settings and pins described by `config`.
///
/// The caller must not hand the pins named in `config` to any other driver.
pub fn open<'d>(
    uart: impl uart::Instance + 'd,
    config: &UartConfig,
) -> Result<Uart<'d, Blocking>, uart::ConfigError> {
    let uart_config = uart::Config::default()
        .with_baudrate(config.baud_rate)
        .with_data_bits(DataBits::_8)
        .with_parity(Parity::None)
        .with_stop_bits(StopBits::_1);

    // SAFETY: the board table assigns these pins to this UART only, and no
    // other driver in the firmware claims them.
    let (rx, tx) = unsafe { (AnyPin::steal(config.rx_pin), AnyPin::steal(config.tx_pin)) };

    let uart = Uart::new(uart, uart_config)?.with_rx(rx).with_tx(tx);
    info!(
        "UART ready: {} baud, rx=GPIO{} tx=GPIO{}",
        config.baud_rate, config.rx_pin, config.tx_pin
    );
    Ok(uart)
}
