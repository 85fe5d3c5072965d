use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoordinateError;

/// Shown when an address has nothing to display.
pub const ADDRESS_PLACEHOLDER: &str = "Address not available";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }

        Ok(Self { latitude, longitude })
    }
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

/// Accuracy tier requested from the location service. The thresholds behind
/// each tier belong to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accuracy {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
}

/// Loosely structured address. Local geocoders fill a few components, remote
/// ones also provide `formatted_address`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub formatted_address: Option<String>,
}

impl Address {
    /// Components in display order.
    pub fn components(&self) -> [Option<&str>; 6] {
        [
            self.name.as_deref(),
            self.street.as_deref(),
            self.city.as_deref(),
            self.region.as_deref(),
            self.postal_code.as_deref(),
            self.country.as_deref(),
        ]
    }
}

/// Human-readable rendering of an address.
///
/// `formatted_address` wins when present; otherwise the components are joined
/// with ", " skipping missing ones. Blank strings count as missing.
pub fn format_address(address: Option<&Address>) -> String {
    let Some(address) = address else {
        return ADDRESS_PLACEHOLDER.to_string();
    };

    if let Some(formatted) = non_empty(address.formatted_address.as_deref()) {
        return formatted.to_string();
    }

    let parts: Vec<&str> = address.components().into_iter().filter_map(non_empty).collect();

    if parts.is_empty() { ADDRESS_PLACEHOLDER.to_string() } else { parts.join(", ") }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The five daily prayers, in the order they fall during the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prayer {
    Fajar,
    Zuhr,
    Asar,
    Magribh,
    Isha,
}

impl Prayer {
    pub const fn all() -> &'static [Prayer] {
        &[Prayer::Fajar, Prayer::Zuhr, Prayer::Asar, Prayer::Magribh, Prayer::Isha]
    }

    /// Column name in the hosted table.
    pub fn column(&self) -> &'static str {
        match self {
            Prayer::Fajar => "Fajar",
            Prayer::Zuhr => "Zuhr",
            Prayer::Asar => "Asar",
            Prayer::Magribh => "Magribh",
            Prayer::Isha => "Isha",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Prayer::Fajar => "Fajr",
            Prayer::Zuhr => "Dhuhr",
            Prayer::Asar => "Asr",
            Prayer::Magribh => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }
}

impl std::fmt::Display for Prayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per prayer. Serialized with the table's column names so it can be
/// flattened into records and update payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerTimes<T> {
    #[serde(rename = "Fajar")]
    pub fajar: T,
    #[serde(rename = "Zuhr")]
    pub zuhr: T,
    #[serde(rename = "Asar")]
    pub asar: T,
    #[serde(rename = "Magribh")]
    pub magribh: T,
    #[serde(rename = "Isha")]
    pub isha: T,
}

impl<T> PrayerTimes<T> {
    pub fn get(&self, prayer: Prayer) -> &T {
        match prayer {
            Prayer::Fajar => &self.fajar,
            Prayer::Zuhr => &self.zuhr,
            Prayer::Asar => &self.asar,
            Prayer::Magribh => &self.magribh,
            Prayer::Isha => &self.isha,
        }
    }

    pub fn get_mut(&mut self, prayer: Prayer) -> &mut T {
        match prayer {
            Prayer::Fajar => &mut self.fajar,
            Prayer::Zuhr => &mut self.zuhr,
            Prayer::Asar => &mut self.asar,
            Prayer::Magribh => &mut self.magribh,
            Prayer::Isha => &mut self.isha,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Prayer, &T)> {
        Prayer::all().iter().map(move |p| (*p, self.get(*p)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> PrayerTimes<U> {
        PrayerTimes {
            fajar: f(&self.fajar),
            zuhr: f(&self.zuhr),
            asar: f(&self.asar),
            magribh: f(&self.magribh),
            isha: f(&self.isha),
        }
    }

    pub fn try_map<U, E>(
        &self,
        mut f: impl FnMut(Prayer, &T) -> Result<U, E>,
    ) -> Result<PrayerTimes<U>, E> {
        Ok(PrayerTimes {
            fajar: f(Prayer::Fajar, &self.fajar)?,
            zuhr: f(Prayer::Zuhr, &self.zuhr)?,
            asar: f(Prayer::Asar, &self.asar)?,
            magribh: f(Prayer::Magribh, &self.magribh)?,
            isha: f(Prayer::Isha, &self.isha)?,
        })
    }
}

/// A row of the hosted mosque table. Prayer times stay in wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosqueRecord {
    pub id: i64,
    #[serde(rename = "Masjid_Name", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "Masjid_Address", default, deserialize_with = "null_as_empty")]
    pub address: String,
    #[serde(flatten)]
    pub times: PrayerTimes<String>,
}

/// The six columns replaced by an editor submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MosqueUpdate {
    #[serde(rename = "Masjid_Name")]
    pub name: String,
    #[serde(rename = "Masjid_Address")]
    pub address: String,
    #[serde(flatten)]
    pub times: PrayerTimes<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
