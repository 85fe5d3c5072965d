use crate::{
    Config,
    geocoder::{google::GoogleGeocoder, nominatim::NominatimGeocoder},
    model::{Address, Coordinate},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod google;
pub mod nominatim;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeocoderId {
    Nominatim,
    Google,
}

impl GeocoderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeocoderId::Nominatim => "nominatim",
            GeocoderId::Google => "google",
        }
    }

    pub const fn all() -> &'static [GeocoderId] {
        &[GeocoderId::Nominatim, GeocoderId::Google]
    }
}

impl std::fmt::Display for GeocoderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for GeocoderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "nominatim" | "osm" => Ok(GeocoderId::Nominatim),
            "google" => Ok(GeocoderId::Google),
            _ => Err(anyhow::anyhow!(
                "Unknown geocoder '{value}'. Supported geocoders: nominatim, google."
            )),
        }
    }
}

/// Turns a coordinate into zero or more address candidates, best first.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync + Debug {
    fn id(&self) -> GeocoderId;

    async fn reverse(&self, coordinate: Coordinate) -> anyhow::Result<Vec<Address>>;
}

/// Construct a geocoder from config and explicit GeocoderId.
pub fn geocoder_from_config(
    id: GeocoderId,
    config: &Config,
) -> anyhow::Result<Box<dyn ReverseGeocoder>> {
    let boxed: Box<dyn ReverseGeocoder> = match id {
        GeocoderId::Nominatim => Box::new(NominatimGeocoder::new()),
        GeocoderId::Google => {
            let api_key = config.geocoder_api_key(id).ok_or_else(|| {
                anyhow::anyhow!(
                    "No API key configured for geocoder '{id}'.\n\
                     Hint: run `masjid configure` or set {}.",
                    crate::config::ENV_GOOGLE_API_KEY
                )
            })?;
            Box::new(GoogleGeocoder::new(api_key.to_owned()))
        }
    };

    Ok(boxed)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
