use thiserror::Error;

use crate::notice::Notice;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside -90..=90")]
    Latitude(f64),
    #[error("longitude {0} is outside -180..=180")]
    Longitude(f64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireTimeError {
    #[error("'{0}' is not a valid time of day")]
    Invalid(String),
}

/// Ways a location resolution can end without an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
    #[error("no address found for this location")]
    GeocodingEmpty,
    #[error("geocoding failed: {0}")]
    GeocodingFailed(String),
}

impl ResolveError {
    pub fn notice(&self) -> Notice {
        match self {
            ResolveError::PermissionDenied => Notice::new(
                "Permission Denied",
                "Please enable location access in your device settings to use this feature.",
            ),
            ResolveError::LocationUnavailable(_) => Notice::error(
                "Failed to fetch location. Please check your internet connection and try again.",
            ),
            ResolveError::GeocodingEmpty => {
                Notice::error("Could not find address for this location.")
            }
            ResolveError::GeocodingFailed(_) => {
                Notice::error("Failed to get address details. Please try again.")
            }
        }
    }
}

/// Failures talking to the hosted table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("backend responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{message}")]
    Api { message: String },
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn notice(&self) -> Notice {
        Notice::error(self.to_string())
    }
}
