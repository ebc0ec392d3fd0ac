//! Forwards build-time settings from `.env` (or the environment) to rustc.

const FORWARDED: [&str; 3] = ["WIFI_SSID", "WIFI_PASSWORD", "AIRSENSE_BOARD"];

fn main() {
    if let Ok(path) = dotenvy::dotenv() {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    for key in FORWARDED {
        println!("cargo:rerun-if-env-changed={key}");
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
