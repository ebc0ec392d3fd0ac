//! Wi-Fi station association
//!
//! Keeps the station associated with the configured access point and mirrors
//! the link state into [`APP_STATE`](crate::app_state::APP_STATE).

use airsense_core::config::InternetConfig;
use alloc::string::String;
use embassy_net::Stack;
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{info, warn};

use crate::app_state::{APP_STATE, AppError, AppRunState};

const RETRY_DELAY: Duration = Duration::from_secs(5);
/// How long to wait for DHCP after association, in 500 ms polls.
const DHCP_POLLS: u8 = 30;

async fn set_link_state(run_state: AppRunState, connected: bool) {
    let mut state = APP_STATE.lock().await;
    state.run_state = run_state;
    state.wifi_connected = connected;
}

async fn start(
    controller: &mut WifiController<'static>,
    internet: &InternetConfig<'static>,
) -> Result<(), AppError> {
    if matches!(controller.is_started(), Ok(true)) {
        return Ok(());
    }

    let client_config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(String::from(internet.ssid))
            .with_password(String::from(internet.password)),
    );
    controller.set_config(&client_config).map_err(AppError::wifi)?;

    info!("Starting Wi-Fi STA");
    controller.start_async().await.map_err(AppError::wifi)
}

async fn wait_for_ipv4(stack: Stack<'static>) -> bool {
    for _ in 0..DHCP_POLLS {
        if stack.is_config_up() {
            return true;
        }
        Timer::after(Duration::from_millis(500)).await;
    }
    stack.is_config_up()
}

#[embassy_executor::task]
pub async fn connection_task(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    internet: InternetConfig<'static>,
) {
    info!("Wi-Fi task starting (ssid=\"{}\")", internet.ssid);

    loop {
        set_link_state(AppRunState::WifiConnecting, false).await;

        if let Err(e) = start(&mut controller, &internet).await {
            warn!("{}", e);
            set_link_state(AppRunState::Error, false).await;
            Timer::after(RETRY_DELAY).await;
            continue;
        }

        info!("Connecting to Wi-Fi SSID=\"{}\"", internet.ssid);
        if let Err(e) = controller.connect_async().await {
            warn!("Wi-Fi connect failed: {:?}", e);
            set_link_state(AppRunState::Error, false).await;
            Timer::after(RETRY_DELAY).await;
            continue;
        }

        if !wait_for_ipv4(stack).await {
            warn!("Wi-Fi DHCP config not ready within timeout");
            set_link_state(AppRunState::Error, false).await;
            Timer::after(RETRY_DELAY).await;
            continue;
        }

        if let Some(cfg) = stack.config_v4() {
            info!("Wi-Fi link up: ip={}", cfg.address.address());
        }
        set_link_state(AppRunState::WifiConnected, true).await;

        controller.wait_for_event(WifiEvent::StaDisconnected).await;
        warn!("Wi-Fi STA disconnected; will retry");
        set_link_state(AppRunState::WifiConnecting, false).await;
        Timer::after(RETRY_DELAY).await;
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: embassy_net::Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}
