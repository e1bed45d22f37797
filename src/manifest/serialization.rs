//! Serialization helpers for the installation manifest

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serializer};

/// Serialize the installation date as RFC 3339
pub fn serialize_date<S>(date: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.to_rfc3339())
}

/// Deserialize an ISO-8601 date, with or without an offset
///
/// Manifests written by older installers carry a local time without an
/// offset; those are read in the local timezone.
pub fn deserialize_date<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid installation_date '{raw}'"))
    })
}

/// Deserialize the catalog as a list of names
///
/// Older manifests stored the whole catalog mapping; only its keys matter.
pub fn deserialize_catalog<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CatalogField {
        Names(Vec<String>),
        Mapping(serde_json::Map<String, serde_json::Value>),
    }

    Ok(match CatalogField::deserialize(deserializer)? {
        CatalogField::Names(names) => names,
        CatalogField::Mapping(map) => map.keys().cloned().collect(),
    })
}

fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date);
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.fixed_offset())
}
