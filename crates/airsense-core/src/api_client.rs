//! Cloud API client
//!
//! Exchanges configuration and telemetry with the cloud endpoint:
//!
//! - `GET /sensors/airgradient:<id>/one/config` pulls the device configuration
//! - `POST /sensors/airgradient:<id>/measures` pushes a measurement
//!
//! Both calls are gated by the local [`Configuration`], and the outcome of the
//! last attempt of each is kept as a failure flag for status display.

use alloc::{format, string::String};
use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::config::{ConfigError, ConfigSource, Configuration, ConfigurationControl};
use crate::device::DeviceId;
use crate::http::{self, HttpError, Request};
use crate::net::TcpConnector;

pub const API_HOST: &str = "hw.airgradient.com";
pub const API_PORT: u16 = 80;
const CONTENT_TYPE_JSON: &str = "application/json";
const STATUS_OK: u16 = 200;
const STATUS_TOO_MANY_REQUESTS: u16 = 429;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Device id not set")]
    MissingDeviceId,
    #[error("WiFi not connected")]
    NotConnected,
    #[error("Connection to server failed")]
    Connect,
    #[error("HTTP error: {0}")]
    Http(HttpError),
    #[error("Unexpected response code: {0}")]
    Status(u16),
    #[error("Configuration error: {0}")]
    Config(ConfigError),
}

impl From<HttpError> for ApiError {
    fn from(value: HttpError) -> Self {
        Self::Http(value)
    }
}

impl From<ConfigError> for ApiError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Configuration is locally controlled; nothing was requested.
    Skipped,
    /// The server configuration was applied.
    Applied { changed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// Posting is disabled by configuration.
    Skipped,
    Accepted,
    /// The server throttled us; the measurement counts as delivered.
    RateLimited,
}

pub struct ApiClient<C> {
    connector: C,
    device_id: Option<DeviceId>,
    fetch_config_failed: bool,
    post_to_server_failed: bool,
}

impl<C: TcpConnector> ApiClient<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            device_id: None,
            fetch_config_failed: false,
            post_to_server_failed: false,
        }
    }

    pub fn begin(&mut self) {
        self.fetch_config_failed = false;
        self.post_to_server_failed = false;
        info!("ApiClient: begin");
    }

    pub fn set_device_id(&mut self, device_id: DeviceId) {
        self.device_id = Some(device_id);
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn path(&self, endpoint: &str) -> Option<String> {
        self.device_id
            .as_ref()
            .map(|id| format!("/sensors/airgradient:{}/{}", id, endpoint))
    }

    /// Pull the device configuration from the cloud and apply it.
    pub async fn fetch_server_configuration(
        &mut self,
        config: &mut Configuration,
    ) -> Result<FetchOutcome, ApiError> {
        if config.configuration_control() == ConfigurationControl::Local {
            warn!("ApiClient: Ignore fetch server configuration");
            // Skipping is not a failure.
            self.fetch_config_failed = false;
            return Ok(FetchOutcome::Skipped);
        }

        let Some(path) = self.path("one/config") else {
            self.fetch_config_failed = true;
            return Err(ApiError::MissingDeviceId);
        };

        let response = {
            let mut conn = match self.connector.connect(API_HOST, API_PORT).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("ApiClient: connect to {} failed: {:?}", API_HOST, e);
                    self.fetch_config_failed = true;
                    return Err(ApiError::Connect);
                }
            };
            http::send(&mut conn, &Request::get(API_HOST, &path)).await
        };

        let response = match response {
            Ok(response) if response.status == STATUS_OK => response,
            Ok(response) => {
                error!("ApiClient: Get configuration failed code: {}", response.status);
                self.fetch_config_failed = true;
                return Err(ApiError::Status(response.status));
            }
            Err(e) => {
                error!("ApiClient: Get configuration failed: {}", e);
                self.fetch_config_failed = true;
                return Err(e.into());
            }
        };

        self.fetch_config_failed = false;

        let body = response.body_str()?;
        let changed = config.parse(body, ConfigSource::Cloud)?;
        Ok(FetchOutcome::Applied { changed })
    }

    /// Post a JSON measurement to the cloud.
    pub async fn post_to_server(
        &mut self,
        config: &Configuration,
        data: &str,
    ) -> Result<PostOutcome, ApiError> {
        if !config.is_post_data_to_airgradient() {
            warn!("ApiClient: Ignore post data to server");
            return Ok(PostOutcome::Skipped);
        }

        if !self.connector.is_connected() {
            return Err(ApiError::NotConnected);
        }

        let Some(path) = self.path("measures") else {
            return Err(ApiError::MissingDeviceId);
        };
        info!("ApiClient: Post uri: http://{}{}", API_HOST, path);
        info!("ApiClient: Post data: {}", data);

        let result = {
            let mut conn = match self.connector.connect(API_HOST, API_PORT).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("ApiClient: connect to {} failed: {:?}", API_HOST, e);
                    return Err(ApiError::Connect);
                }
            };
            let request = Request::post(API_HOST, &path, CONTENT_TYPE_JSON, data.as_bytes());
            http::send(&mut conn, &request).await
        };

        match result {
            Ok(response) if response.status == STATUS_OK => {
                self.post_to_server_failed = false;
                Ok(PostOutcome::Accepted)
            }
            Ok(response) if response.status == STATUS_TOO_MANY_REQUESTS => {
                self.post_to_server_failed = false;
                Ok(PostOutcome::RateLimited)
            }
            Ok(response) => {
                error!("ApiClient: Post response failed code: {}", response.status);
                self.post_to_server_failed = true;
                Err(ApiError::Status(response.status))
            }
            Err(e) => {
                error!("ApiClient: Post response failed: {}", e);
                self.post_to_server_failed = true;
                Err(e.into())
            }
        }
    }

    pub fn is_fetch_configure_failed(&self) -> bool {
        self.fetch_config_failed
    }

    pub fn is_post_to_server_failed(&self) -> bool {
        self.post_to_server_failed
    }
}
