//! Core library for the `masjid` app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Location resolution over pluggable reverse geocoders
//! - The hosted mosque table client
//! - List and editor view models, and the wire-time codec they share
//!
//! It is used by `masjid-cli`, but the view models carry no terminal code and
//! can back any front end.

pub mod config;
pub mod editor;
pub mod error;
pub mod geocoder;
pub mod list;
pub mod location;
pub mod model;
pub mod notice;
pub mod resolver;
pub mod route;
pub mod store;
pub mod wire_time;

pub use config::{BackendConfig, Config, GeocoderConfig};
pub use editor::{EditForm, EditOutcome, EntryEditor, PickerState};
pub use error::{BackendError, ResolveError, WireTimeError};
pub use geocoder::{GeocoderId, ReverseGeocoder};
pub use list::{ListState, ListView};
pub use location::{LocationService, ManualLocation, Permission};
pub use model::{Accuracy, Address, Coordinate, MosqueRecord, MosqueUpdate, Prayer, PrayerTimes};
pub use notice::Notice;
pub use resolver::{LocationResolver, Resolution, ResolverState};
pub use route::Route;
pub use store::{MosqueStore, SupabaseClient};
