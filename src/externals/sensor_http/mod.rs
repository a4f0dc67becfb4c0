use crate::{config::SensorConfig, internals::core::ports::FetchError};

use self::services::HttpTemperatureService;

pub mod services;

pub struct SensorHttpModule {
    pub temperature_service: HttpTemperatureService,
}

impl SensorHttpModule {
    pub fn initialize(config: &SensorConfig) -> Result<Self, FetchError> {
        Ok(Self {
            temperature_service: HttpTemperatureService::new(
                config.url.clone(),
                config.request_timeout(),
            )?,
        })
    }
}
