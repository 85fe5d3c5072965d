use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::model::{Address, Coordinate};

use super::{GeocoderId, ReverseGeocoder, truncate_body};

const REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

// Nominatim rejects requests without an identifying agent.
const USER_AGENT: &str = concat!("masjid-core/", env!("CARGO_PKG_VERSION"));

/// OpenStreetMap Nominatim. Yields a partial address without a formatted line.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    http: Client,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        let http = Client::builder().user_agent(USER_AGENT).build().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default HTTP client");
            Client::new()
        });

        Self { http }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    fn id(&self) -> GeocoderId {
        GeocoderId::Nominatim
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Vec<Address>> {
        let res = self
            .http
            .get(REVERSE_URL)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("addressdetails", "1".to_string()),
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Nominatim")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Nominatim response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Nominatim request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let addresses = parse_response(&body)?;
        debug!(candidates = addresses.len(), "nominatim reverse geocode finished");
        Ok(addresses)
    }
}

#[derive(Debug, Default, Deserialize)]
struct NAddress {
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NResponse {
    error: Option<String>,
    name: Option<String>,
    address: Option<NAddress>,
}

/// Map a `jsonv2` reverse body to candidates. An `error` payload
/// ("Unable to geocode") means no candidates.
pub fn parse_response(body: &str) -> Result<Vec<Address>> {
    let parsed: NResponse = serde_json::from_str(body).context("Failed to parse Nominatim JSON")?;

    if let Some(reason) = parsed.error {
        debug!(%reason, "nominatim found nothing");
        return Ok(Vec::new());
    }

    let Some(addr) = parsed.address else {
        return Ok(Vec::new());
    };

    let address = Address {
        name: parsed.name.filter(|n| !n.is_empty()),
        street: addr.road,
        city: addr.city.or(addr.town).or(addr.village),
        region: addr.state,
        postal_code: addr.postcode,
        country: addr.country,
        formatted_address: None,
    };

    Ok(vec![address])
}
