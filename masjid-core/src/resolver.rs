//! Device position plus reverse geocoding, with a remote fallback.
//!
//! Each call to [`LocationResolver::resolve`] is one generation. Starting a
//! new generation signals the previous one to stop, and only the latest
//! generation may write to the shared [`ResolverState`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    error::ResolveError,
    geocoder::ReverseGeocoder,
    location::{LocationService, Permission},
    model::{Accuracy, Address, Coordinate, format_address},
    notice::Notice,
};

/// What a screen would render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverState {
    pub coordinate: Option<Coordinate>,
    pub address: Option<Address>,
    pub loading: bool,
    pub notices: Vec<Notice>,
}

impl ResolverState {
    pub fn formatted_address(&self) -> String {
        format_address(self.address.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// This invocation was the latest one and its result is now the state.
    Applied {
        coordinate: Option<Coordinate>,
        address: Option<Address>,
        notice: Option<Notice>,
    },
    /// A newer invocation started before this one finished.
    Superseded,
}

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    cancel: Option<watch::Sender<bool>>,
    state: ResolverState,
}

#[derive(Debug)]
struct Attempt {
    coordinate: Option<Coordinate>,
    address: Option<Address>,
    error: Option<ResolveError>,
}

#[derive(Debug)]
pub struct LocationResolver {
    location: Arc<dyn LocationService>,
    primary: Arc<dyn ReverseGeocoder>,
    fallback: Arc<dyn ReverseGeocoder>,
    inner: Mutex<Inner>,
}

impl LocationResolver {
    pub fn new(
        location: Arc<dyn LocationService>,
        primary: Arc<dyn ReverseGeocoder>,
        fallback: Arc<dyn ReverseGeocoder>,
    ) -> Self {
        Self { location, primary, fallback, inner: Mutex::new(Inner::default()) }
    }

    pub fn state(&self) -> ResolverState {
        self.lock().state.clone()
    }

    /// Drain notices that have not been shown yet.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.lock().state.notices)
    }

    pub async fn refresh(&self) -> Resolution {
        self.resolve().await
    }

    pub async fn resolve(&self) -> Resolution {
        let (generation, mut cancelled) = self.begin();
        let _loading = LoadingGuard { resolver: self, generation };

        let attempt = tokio::select! {
            biased;
            _ = wait_cancelled(&mut cancelled) => None,
            attempt = self.attempt() => Some(attempt),
        };

        match attempt {
            Some(attempt) => self.apply(generation, attempt),
            None => {
                debug!(generation, "resolution cancelled by a newer one");
                Resolution::Superseded
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> (u64, watch::Receiver<bool>) {
        let mut inner = self.lock();

        if let Some(previous) = inner.cancel.take() {
            let _ = previous.send(true);
        }

        let (tx, rx) = watch::channel(false);
        inner.generation += 1;
        inner.cancel = Some(tx);
        inner.state.loading = true;

        (inner.generation, rx)
    }

    fn apply(&self, generation: u64, attempt: Attempt) -> Resolution {
        let mut inner = self.lock();
        if inner.generation != generation {
            return Resolution::Superseded;
        }

        let notice = attempt.error.as_ref().map(ResolveError::notice);

        inner.state.coordinate = attempt.coordinate;
        inner.state.address = attempt.address.clone();
        if let Some(notice) = &notice {
            inner.state.notices.push(notice.clone());
        }

        Resolution::Applied { coordinate: attempt.coordinate, address: attempt.address, notice }
    }

    async fn attempt(&self) -> Attempt {
        if self.location.request_permission().await == Permission::Denied {
            info!("location permission denied");
            return Attempt {
                coordinate: None,
                address: None,
                error: Some(ResolveError::PermissionDenied),
            };
        }

        let coordinate = match self.location.current_position(Accuracy::Balanced).await {
            Ok(coordinate) => coordinate,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to read current position");
                return Attempt {
                    coordinate: None,
                    address: None,
                    error: Some(ResolveError::LocationUnavailable(format!("{err:#}"))),
                };
            }
        };

        match self.lookup(coordinate).await {
            Ok(address) => {
                Attempt { coordinate: Some(coordinate), address: Some(address), error: None }
            }
            Err(err) => Attempt { coordinate: Some(coordinate), address: None, error: Some(err) },
        }
    }

    async fn lookup(&self, coordinate: Coordinate) -> Result<Address, ResolveError> {
        let candidates = self.primary.reverse(coordinate).await.map_err(|err| {
            warn!(geocoder = %self.primary.id(), error = %format!("{err:#}"), "geocoding error");
            ResolveError::GeocodingFailed(format!("{err:#}"))
        })?;

        if let Some(first) = candidates.into_iter().next() {
            return Ok(first);
        }

        debug!(
            primary = %self.primary.id(),
            fallback = %self.fallback.id(),
            "primary geocoder found nothing, trying fallback"
        );

        let candidates = self.fallback.reverse(coordinate).await.map_err(|err| {
            warn!(geocoder = %self.fallback.id(), error = %format!("{err:#}"), "geocoding error");
            ResolveError::GeocodingFailed(format!("{err:#}"))
        })?;

        candidates.into_iter().next().ok_or(ResolveError::GeocodingEmpty)
    }
}

/// Clears `loading` on every exit path, including a dropped future, unless a
/// newer generation has taken over.
struct LoadingGuard<'a> {
    resolver: &'a LocationResolver,
    generation: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.resolver.lock();
        if inner.generation == self.generation {
            inner.state.loading = false;
            inner.cancel = None;
        }
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoder::GeocoderId;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    #[derive(Debug)]
    struct FakeLocation {
        permission: Permission,
        position: Option<Coordinate>,
        // Calls with an index below this never finish.
        stall_first: usize,
        calls: AtomicUsize,
    }

    impl FakeLocation {
        fn at(lat: f64, lon: f64) -> Self {
            Self {
                permission: Permission::Granted,
                position: Some(Coordinate { latitude: lat, longitude: lon }),
                stall_first: 0,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LocationService for FakeLocation {
        async fn request_permission(&self) -> Permission {
            self.permission
        }

        async fn current_position(&self, accuracy: Accuracy) -> anyhow::Result<Coordinate> {
            assert_eq!(accuracy, Accuracy::Balanced);
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.stall_first {
                std::future::pending::<()>().await;
            }
            self.position.ok_or_else(|| anyhow!("gps off"))
        }
    }

    #[derive(Debug)]
    struct FakeGeocoder {
        id: GeocoderId,
        result: Result<Vec<Address>, String>,
        calls: AtomicUsize,
    }

    impl FakeGeocoder {
        fn returning(id: GeocoderId, addresses: Vec<Address>) -> Arc<Self> {
            Arc::new(Self { id, result: Ok(addresses), calls: AtomicUsize::new(0) })
        }

        fn failing(id: GeocoderId, message: &str) -> Arc<Self> {
            Arc::new(Self { id, result: Err(message.to_string()), calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReverseGeocoder for FakeGeocoder {
        fn id(&self) -> GeocoderId {
            self.id
        }

        async fn reverse(&self, _coordinate: Coordinate) -> anyhow::Result<Vec<Address>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(|msg| anyhow!(msg))
        }
    }

    fn local(name: &str) -> Address {
        Address { name: Some(name.into()), city: Some("Lahore".into()), ..Address::default() }
    }

    fn remote(formatted: &str) -> Address {
        Address {
            name: Some(formatted.into()),
            country: Some("Pakistan".into()),
            formatted_address: Some(formatted.into()),
            ..Address::default()
        }
    }

    fn resolver(
        location: FakeLocation,
        primary: &Arc<FakeGeocoder>,
        fallback: &Arc<FakeGeocoder>,
    ) -> LocationResolver {
        LocationResolver::new(Arc::new(location), primary.clone(), fallback.clone())
    }

    #[tokio::test]
    async fn denial_leaves_nothing_and_one_notice() {
        let primary = FakeGeocoder::returning(GeocoderId::Nominatim, vec![local("A")]);
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![]);
        let location = FakeLocation { permission: Permission::Denied, ..FakeLocation::at(1.0, 2.0) };
        let resolver = resolver(location, &primary, &fallback);

        let resolution = resolver.resolve().await;

        let state = resolver.state();
        assert_eq!(state.coordinate, None);
        assert_eq!(state.address, None);
        assert!(!state.loading);
        assert_eq!(state.notices.len(), 1);
        assert_eq!(state.notices[0].title, "Permission Denied");
        assert!(matches!(resolution, Resolution::Applied { notice: Some(_), .. }));
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn primary_candidate_wins_and_fallback_is_not_called() {
        let primary =
            FakeGeocoder::returning(GeocoderId::Nominatim, vec![local("First"), local("Second")]);
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![remote("unused")]);
        let resolver = resolver(FakeLocation::at(31.5, 74.3), &primary, &fallback);

        resolver.resolve().await;

        let state = resolver.state();
        assert_eq!(state.address, Some(local("First")));
        assert_eq!(state.coordinate, Some(Coordinate { latitude: 31.5, longitude: 74.3 }));
        assert_eq!(state.formatted_address(), "First, Lahore");
        assert!(state.notices.is_empty());
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn empty_primary_falls_back_to_remote() {
        let primary = FakeGeocoder::returning(GeocoderId::Nominatim, vec![]);
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![remote("Mall Rd, Lahore")]);
        let resolver = resolver(FakeLocation::at(31.5, 74.3), &primary, &fallback);

        resolver.resolve().await;

        let state = resolver.state();
        let address = state.address.as_ref().expect("address from fallback");
        assert_eq!(address.formatted_address.as_deref(), Some("Mall Rd, Lahore"));
        assert_eq!(state.formatted_address(), "Mall Rd, Lahore");
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn both_empty_gives_no_address_notice() {
        let primary = FakeGeocoder::returning(GeocoderId::Nominatim, vec![]);
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![]);
        let resolver = resolver(FakeLocation::at(0.0, 0.0), &primary, &fallback);

        resolver.resolve().await;

        let state = resolver.state();
        assert!(state.coordinate.is_some());
        assert_eq!(state.address, None);
        assert_eq!(state.formatted_address(), "Address not available");
        assert_eq!(state.notices, vec![ResolveError::GeocodingEmpty.notice()]);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn geocoder_failure_is_a_notice_not_a_fallback() {
        let primary = FakeGeocoder::failing(GeocoderId::Nominatim, "503 from upstream");
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![remote("unused")]);
        let resolver = resolver(FakeLocation::at(0.0, 0.0), &primary, &fallback);

        let resolution = resolver.resolve().await;

        let Resolution::Applied { notice: Some(notice), address: None, .. } = resolution else {
            panic!("expected an applied failure, got {resolution:?}");
        };
        assert_eq!(notice.message, "Failed to get address details. Please try again.");
        assert_eq!(fallback.calls(), 0);
        assert!(!resolver.state().loading);
    }

    #[tokio::test]
    async fn position_failure_clears_loading() {
        let primary = FakeGeocoder::returning(GeocoderId::Nominatim, vec![local("A")]);
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![]);
        let location = FakeLocation { position: None, ..FakeLocation::at(0.0, 0.0) };
        let resolver = resolver(location, &primary, &fallback);

        resolver.resolve().await;

        let state = resolver.state();
        assert!(!state.loading);
        assert_eq!(state.coordinate, None);
        assert!(state.notices[0].message.starts_with("Failed to fetch location"));
    }

    #[tokio::test]
    async fn repeated_resolution_is_stable() {
        let primary = FakeGeocoder::returning(GeocoderId::Nominatim, vec![local("Same")]);
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![]);
        let resolver = resolver(FakeLocation::at(10.0, 20.0), &primary, &fallback);

        let first = resolver.resolve().await;
        let second = resolver.refresh().await;

        assert_eq!(first, second);
        assert_eq!(resolver.state().address, Some(local("Same")));
    }

    #[tokio::test]
    async fn newer_invocation_supersedes_a_stalled_one() {
        let primary = FakeGeocoder::returning(GeocoderId::Nominatim, vec![local("Latest")]);
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![]);
        let location = FakeLocation { stall_first: 1, ..FakeLocation::at(1.0, 1.0) };
        let resolver = resolver(location, &primary, &fallback);

        let (first, second) = tokio::join!(resolver.resolve(), async {
            tokio::task::yield_now().await;
            resolver.refresh().await
        });

        assert_eq!(first, Resolution::Superseded);
        assert!(matches!(second, Resolution::Applied { address: Some(_), .. }));

        let state = resolver.state();
        assert!(!state.loading);
        assert_eq!(state.address, Some(local("Latest")));
    }

    #[tokio::test]
    async fn dropped_invocation_still_clears_loading() {
        let primary = FakeGeocoder::returning(GeocoderId::Nominatim, vec![local("A")]);
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![]);
        let location = FakeLocation { stall_first: 1, ..FakeLocation::at(1.0, 1.0) };
        let resolver = resolver(location, &primary, &fallback);

        let timed_out = tokio::time::timeout(Duration::from_millis(20), resolver.resolve()).await;

        assert!(timed_out.is_err());
        assert!(!resolver.state().loading);
    }

    #[tokio::test]
    async fn notices_are_one_shot() {
        let primary = FakeGeocoder::returning(GeocoderId::Nominatim, vec![]);
        let fallback = FakeGeocoder::returning(GeocoderId::Google, vec![]);
        let resolver = resolver(FakeLocation::at(0.0, 0.0), &primary, &fallback);

        resolver.resolve().await;

        assert_eq!(resolver.take_notices().len(), 1);
        assert!(resolver.take_notices().is_empty());
    }
}
