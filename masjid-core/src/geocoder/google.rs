use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::model::{Address, Coordinate};

use super::{GeocoderId, ReverseGeocoder, truncate_body};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Google Geocoding API, used as the remote fallback.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    api_key: String,
    http: Client,
}

impl GoogleGeocoder {
    pub fn new(api_key: String) -> Self {
        Self { api_key, http: Client::new() }
    }
}

#[async_trait]
impl ReverseGeocoder for GoogleGeocoder {
    fn id(&self) -> GeocoderId {
        GeocoderId::Google
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<Address>> {
        let latlng = format!("{},{}", coordinate.latitude, coordinate.longitude);

        let res = self
            .http
            .get(GEOCODE_URL)
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await
            .context("Failed to send request to Google Geocoding API")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Google Geocoding response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Google Geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let addresses = parse_response(&body)?;
        debug!(candidates = addresses.len(), "google reverse geocode finished");
        Ok(addresses)
    }
}

#[derive(Debug, Deserialize)]
struct GComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GResult {
    formatted_address: Option<String>,
    #[serde(default)]
    address_components: Vec<GComponent>,
}

#[derive(Debug, Deserialize)]
struct GResponse {
    status: String,
    #[serde(default)]
    results: Vec<GResult>,
    error_message: Option<String>,
}

impl GResult {
    fn component(&self, kind: &str) -> Option<String> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.clone())
    }

    fn into_address(self) -> Address {
        Address {
            name: self.formatted_address.clone(),
            street: self.component("route"),
            city: self.component("locality"),
            region: self.component("administrative_area_level_1"),
            postal_code: self.component("postal_code"),
            country: self.component("country"),
            formatted_address: self.formatted_address,
        }
    }
}

/// Map a geocode JSON body to address candidates. `ZERO_RESULTS` is an empty
/// list, any other non-OK status is an error.
pub fn parse_response(body: &str) -> Result<Vec<Address>> {
    let parsed: GResponse =
        serde_json::from_str(body).context("Failed to parse Google Geocoding JSON")?;

    match parsed.status.as_str() {
        "OK" => Ok(parsed.results.into_iter().map(GResult::into_address).collect()),
        "ZERO_RESULTS" => Ok(Vec::new()),
        other => Err(anyhow!(
            "Google Geocoding returned status {}: {}",
            other,
            parsed.error_message.as_deref().unwrap_or("no details"),
        )),
    }
}
