use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::fmt::Debug;

use crate::model::{Accuracy, Coordinate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Device-side position source.
#[async_trait]
pub trait LocationService: Send + Sync + Debug {
    async fn request_permission(&self) -> Permission;

    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinate>;
}

/// A position supplied up front, e.g. from command-line arguments, with the
/// user's consent answer already collected.
#[derive(Debug, Clone)]
pub struct ManualLocation {
    coordinate: Option<Coordinate>,
    consent: Permission,
}

impl ManualLocation {
    pub fn new(coordinate: Option<Coordinate>, consent: Permission) -> Self {
        Self { coordinate, consent }
    }
}

#[async_trait]
impl LocationService for ManualLocation {
    async fn request_permission(&self) -> Permission {
        self.consent
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<Coordinate> {
        self.coordinate.ok_or_else(|| {
            anyhow!(
                "No position available.\n\
                 Hint: pass --lat and --lon, or set [home] in the config file."
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_location_reports_consent_and_position() {
        let here = Coordinate::new(24.86, 67.01).expect("valid");
        let svc = ManualLocation::new(Some(here), Permission::Granted);

        assert_eq!(svc.request_permission().await, Permission::Granted);
        assert_eq!(svc.current_position(Accuracy::Balanced).await.expect("known"), here);
    }

    #[tokio::test]
    async fn missing_position_is_an_error_with_hint() {
        let svc = ManualLocation::new(None, Permission::Granted);
        let err = svc.current_position(Accuracy::Balanced).await.unwrap_err();

        assert!(err.to_string().contains("--lat"));
    }
}
