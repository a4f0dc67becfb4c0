use std::time::Duration;

use reqwest::{Client, Url};
use tracing::{debug, trace};

use crate::{
    internals::core::ports::{FetchError, TemperatureSource},
    models::{Temperature, TemperatureReading},
};

/// Fetches the temperature with a plain HTTP GET against a fixed URL and
/// reads the body as a bare decimal number, e.g. `21.5`.
#[derive(Clone)]
pub struct HttpTemperatureService {
    url: Url,
    client: Client,
}

impl HttpTemperatureService {
    /// Build a service whose every request (connect included) is bounded by
    /// `timeout`.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl TemperatureSource for HttpTemperatureService {
    #[tracing::instrument(skip_all, fields(url = %self.url))]
    async fn fetch(&self) -> Result<TemperatureReading, FetchError> {
        trace!("Sending request.");
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(describe_network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(describe_network_error)?;
        debug!("Response from HTTP request: {:?}", body);

        let temperature = body.parse::<Temperature>()?;
        Ok(TemperatureReading::new(temperature))
    }
}

/// Keep the reason reqwest gives alongside what kind of failure it was.
fn describe_network_error(e: reqwest::Error) -> FetchError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_body() || e.is_decode() {
        "failed reading body"
    } else {
        "request failed"
    };
    FetchError::Network(format!("{}: {}", kind, e))
}
