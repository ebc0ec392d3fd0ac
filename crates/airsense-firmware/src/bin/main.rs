#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::str::FromStr;

use airsense_core::api_client::{ApiClient, FetchOutcome, PostOutcome};
use airsense_core::board::{BoardType, SerialPort};
use airsense_core::config::{Config, Configuration, InternetConfig, PmStandard};
use airsense_core::device::device_id_from_mac;
use airsense_core::measurement::Measurement;
use airsense_core::sensors::Pms5003t;
use airsense_core::sensors::pms::{AqiCategory, pm25_to_us_aqi};
use airsense_firmware::app_state::{APP_STATE, AppError};
use airsense_firmware::net::EmbassyConnector;
use airsense_firmware::{serial, wifi};
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, DhcpConfig, StackResources};
use embassy_time::{Duration, Instant, Ticker, Timer};
use esp_hal::Blocking;
use esp_hal::clock::CpuClock;
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::Uart;
use log::{error, info, warn};

const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
const BOARD: Option<&str> = option_env!("AIRSENSE_BOARD");
const DEFAULT_BOARD: BoardType = BoardType::OneIndoor;
const PMS_PORT: SerialPort = SerialPort::Primary;

const SENSOR_POLL_INTERVAL: Duration = Duration::from_millis(100);
const CLOUD_INTERVAL: Duration = Duration::from_secs(60);
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

type PmsSensor = Pms5003t<Uart<'static, Blocking>>;

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn select_board() -> Result<BoardType, AppError> {
    match BOARD {
        Some(name) => BoardType::from_str(name).map_err(AppError::board),
        None => Ok(DEFAULT_BOARD),
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 66320);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    info!("Embassy initialized!");

    let board = match select_board() {
        Ok(board) => board,
        Err(e) => {
            error!("{}", e);
            halt().await
        }
    };
    let device_config = Config {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        board,
    };
    info!("Board: {}", device_config.board.name());

    // Sensor first: it does not depend on the network.
    let mut pms = PmsSensor::new(device_config.board);
    let uart0 = peripherals.UART0;
    let uart1 = peripherals.UART1;
    match pms.begin(PMS_PORT, |uart_config| match uart_config.port {
        SerialPort::Primary => serial::open(uart0, uart_config),
        SerialPort::Shared => serial::open(uart1, uart_config),
    }) {
        Ok(()) => match spawner.spawn(sensor_task(pms)) {
            Ok(()) => info!("PMS5003T sensor task started"),
            Err(e) => error!("Failed to spawn sensor task: {:?}", e),
        },
        Err(e) => {
            let e = AppError::sensor(e);
            error!("{}", e);
            APP_STATE.lock().await.pms_failed = true;
        }
    }

    let radio = match esp_radio::init() {
        Ok(radio) => mk_static!(esp_radio::Controller<'static>, radio),
        Err(e) => {
            error!("Wi-Fi radio init failed: {:?}", e);
            halt().await
        }
    };
    let (wifi_controller, interfaces) =
        match esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()) {
            Ok(wifi) => wifi,
            Err(e) => {
                error!("Wi-Fi driver init failed: {:?}", e);
                halt().await
            }
        };

    let wifi_device = interfaces.sta;
    let device_id = device_id_from_mac(wifi_device.mac_address());
    info!("Device id: {}", device_id);

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        wifi_device,
        NetConfig::dhcpv4(DhcpConfig::default()),
        mk_static!(StackResources<4>, StackResources::<4>::new()),
        seed,
    );

    if let Err(e) = spawner.spawn(wifi::connection_task(
        wifi_controller,
        stack,
        device_config.internet,
    )) {
        error!("Failed to spawn Wi-Fi task: {:?}", e);
    }
    if let Err(e) = spawner.spawn(wifi::net_task(runner)) {
        error!("Failed to spawn network runner: {:?}", e);
    }

    let client = mk_static!(
        ApiClient<EmbassyConnector>,
        ApiClient::new(EmbassyConnector::new(stack))
    );
    client.set_device_id(device_id);
    if let Err(e) = spawner.spawn(cloud_task(client)) {
        error!("Failed to spawn cloud task: {:?}", e);
    }

    let mut ticker = Ticker::every(STATUS_INTERVAL);
    loop {
        ticker.next().await;
        let state = APP_STATE.lock().await;
        info!(
            "Status: {:?}, wifi={}, pms_failed={}",
            state.run_state, state.wifi_connected, state.pms_failed
        );
    }
}

async fn halt() -> ! {
    loop {
        Timer::after(Duration::from_secs(60)).await;
    }
}

#[embassy_executor::task]
async fn sensor_task(mut pms: PmsSensor) {
    let mut ticker = Ticker::every(SENSOR_POLL_INTERVAL);
    loop {
        if let Err(e) = pms.handle(Instant::now()) {
            warn!("{}", e);
        }

        {
            let mut state = APP_STATE.lock().await;
            state.pms = pms.readings();
            state.pms_failed = pms.is_failed();
        }

        ticker.next().await;
    }
}

#[embassy_executor::task]
async fn cloud_task(client: &'static mut ApiClient<EmbassyConnector>) {
    let mut configuration = Configuration::default();
    let mut boot: u32 = 0;
    let mut payload = [0u8; 256];

    client.begin();
    let mut ticker = Ticker::every(CLOUD_INTERVAL);
    loop {
        client.connector().stack().wait_config_up().await;

        match client.fetch_server_configuration(&mut configuration).await {
            Ok(FetchOutcome::Applied { changed: true }) => info!("Server configuration applied"),
            Ok(_) => {}
            Err(e) => warn!("Fetch server configuration failed: {}", e),
        }

        let (readings, pms_failed) = {
            let state = APP_STATE.lock().await;
            (state.pms, state.pms_failed)
        };

        let mut measurement = Measurement::new(boot);
        match readings {
            Some(readings) if !pms_failed => {
                if configuration.pm_standard() == PmStandard::UsAqi {
                    let aqi = pm25_to_us_aqi(readings.pm25_ae);
                    info!("US AQI {} ({})", aqi, AqiCategory::from_aqi(aqi).label());
                }
                measurement = measurement.with_pms(&readings);
            }
            _ => warn!("No valid PMS5003T readings to report"),
        }

        match measurement.to_json(&mut payload) {
            Ok(json) => match client.post_to_server(&configuration, json).await {
                Ok(PostOutcome::RateLimited) => warn!("Server is rate limiting posts"),
                Ok(_) => {}
                Err(e) => warn!("Post to server failed: {}", e),
            },
            Err(e) => error!("Measurement serialization failed: {:?}", e),
        }

        boot = boot.wrapping_add(1);
        ticker.next().await;
    }
}
