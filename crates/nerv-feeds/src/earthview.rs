//! Google Earth View imagery: the published image index plus per-image
//! download and decode.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbImage;
use nerv_logging::targets::T_EARTHVIEW;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::cache::TtlCache;
use crate::error::{FeedError, Result};
use crate::http::Transport;

pub const EARTHVIEW_JSON_URL: &str =
    "https://raw.githubusercontent.com/limhenry/earthview/master/earthview.json";

static MAP_COORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@([-\d.]+),([-\d.]+)").expect("coordinate pattern is valid")
});

/// One index entry. The published list has `null` for some fields; those
/// read the same as a missing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthViewEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub map: String,
    #[serde(
        default = "EarthViewEntry::default_country",
        deserialize_with = "null_as_unknown_country"
    )]
    pub country: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub region: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

fn null_as_unknown_country<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(de)?.unwrap_or_else(EarthViewEntry::default_country))
}

impl EarthViewEntry {
    fn default_country() -> String {
        "Unknown".to_string()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        parse_coordinates(&self.map)
    }

    /// `REGION, COUNTRY` in upper case, at most 30 characters.
    pub fn location_label(&self) -> String {
        const MAX: usize = 30;
        let label = if self.region.is_empty() {
            self.country.to_uppercase()
        } else {
            format!("{}, {}", self.region, self.country).to_uppercase()
        };
        if label.chars().count() <= MAX {
            return label;
        }
        let mut short: String = label.chars().take(MAX - 2).collect();
        short.push_str("..");
        short
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}{ns} {:.4}{ew}", self.lat.abs(), self.lon.abs())
    }
}

/// Pulls `lat,lon` out of a Maps link such as
/// `https://www.google.com/maps/@45.962714,7.724891,16z/...`.
pub fn parse_coordinates(map_url: &str) -> Option<Coordinates> {
    let caps = MAP_COORDS.captures(map_url)?;
    let lat = caps.get(1)?.as_str().parse().ok()?;
    let lon = caps.get(2)?.as_str().parse().ok()?;
    Some(Coordinates { lat, lon })
}

pub struct EarthViewClient {
    transport: Arc<dyn Transport>,
    list_url: String,
    list: TtlCache<String, Arc<Vec<EarthViewEntry>>>,
    image: Option<(String, Arc<RgbImage>)>,
}

impl EarthViewClient {
    pub const LIST_TTL: Duration = Duration::from_secs(24 * 60 * 60);
    pub const LIST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_list_url(transport, EARTHVIEW_JSON_URL)
    }

    pub fn with_list_url(transport: Arc<dyn Transport>, list_url: impl Into<String>) -> Self {
        Self {
            transport,
            list_url: list_url.into(),
            list: TtlCache::new(Self::LIST_TTL),
            image: None,
        }
    }

    pub fn invalidate(&mut self) {
        self.list.clear();
        self.image = None;
    }

    /// The shuffled image index, refetched once a day. Empty when it cannot
    /// be fetched.
    pub fn entries(&mut self) -> Arc<Vec<EarthViewEntry>> {
        let now = Instant::now();
        if let Some(list) = self.list.get(&self.list_url, now) {
            return Arc::clone(list);
        }
        match self.fetch_list() {
            Ok(mut entries) => {
                entries.shuffle(&mut rand::thread_rng());
                tracing::info!(target: T_EARTHVIEW, count = entries.len(), "image index refreshed");
                let entries = Arc::new(entries);
                self.list
                    .insert(self.list_url.clone(), Arc::clone(&entries), now);
                entries
            }
            Err(err) => {
                tracing::warn!(target: T_EARTHVIEW, error = %err, "image index fetch failed");
                Arc::new(Vec::new())
            }
        }
    }

    fn fetch_list(&self) -> Result<Vec<EarthViewEntry>> {
        let bytes = self.transport.get(&self.list_url, Self::LIST_TIMEOUT)?;
        serde_json::from_slice(&bytes).map_err(|source| FeedError::Json {
            url: self.list_url.clone(),
            source,
        })
    }

    /// Decoded image for `entry`. The most recent image is kept so repeated
    /// renders of the same entry do not refetch.
    pub fn image(&mut self, entry: &EarthViewEntry) -> Option<Arc<RgbImage>> {
        if entry.image.is_empty() {
            return None;
        }
        if let Some((url, image)) = &self.image {
            if *url == entry.image {
                return Some(Arc::clone(image));
            }
        }
        match self.fetch_image(&entry.image) {
            Ok(image) => {
                let image = Arc::new(image);
                self.image = Some((entry.image.clone(), Arc::clone(&image)));
                Some(image)
            }
            Err(err) => {
                tracing::warn!(target: T_EARTHVIEW, url = %entry.image, error = %err, "image fetch failed");
                None
            }
        }
    }

    fn fetch_image(&self, url: &str) -> Result<RgbImage> {
        let bytes = self.transport.get(url, Self::IMAGE_TIMEOUT)?;
        Ok(image::load_from_memory(&bytes)?.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_from_map_link() {
        let c = parse_coordinates("https://www.google.com/maps/@45.962714,7.724891,16z/data=!3m1!1e3").unwrap();
        assert!((c.lat - 45.962714).abs() < 1e-9);
        assert!((c.lon - 7.724891).abs() < 1e-9);
        assert_eq!(parse_coordinates("https://www.google.com/maps/place/nowhere"), None);
    }

    #[test]
    fn coordinates_display_with_hemispheres() {
        assert_eq!(Coordinates { lat: 45.962714, lon: 7.724891 }.to_string(), "45.9627N 7.7249E");
        assert_eq!(Coordinates { lat: -33.5, lon: -70.25 }.to_string(), "33.5000S 70.2500W");
    }

    #[test]
    fn location_label_is_upper_and_bounded() {
        let entry = EarthViewEntry {
            image: String::new(),
            map: String::new(),
            country: "Chile".to_string(),
            region: "Antofagasta".to_string(),
        };
        assert_eq!(entry.location_label(), "ANTOFAGASTA, CHILE");

        let long = EarthViewEntry {
            region: "Provincia de Santa Cruz de Tenerife".to_string(),
            country: "Spain".to_string(),
            ..entry.clone()
        };
        let label = long.location_label();
        assert_eq!(label.chars().count(), 30);
        assert!(label.ends_with(".."));

        let bare = EarthViewEntry {
            region: String::new(),
            ..entry
        };
        assert_eq!(bare.location_label(), "CHILE");
    }

    #[test]
    fn entry_defaults() {
        let entry: EarthViewEntry = serde_json::from_str(r#"{"image":"https://x/1.jpg"}"#).unwrap();
        assert_eq!(entry.country, "Unknown");
        assert!(entry.region.is_empty());
        assert_eq!(entry.coordinates(), None);
    }

    #[test]
    fn null_fields_do_not_sink_the_list() {
        let list: Vec<EarthViewEntry> = serde_json::from_str(
            r#"[
                {"image": "https://x/1.jpg", "map": null, "country": "Chile", "region": null},
                {"image": "https://x/2.jpg", "country": null, "region": "Hokkaido"}
            ]"#,
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].location_label(), "CHILE");
        assert_eq!(list[0].coordinates(), None);
        assert_eq!(list[1].country, "Unknown");
        assert_eq!(list[1].location_label(), "HOKKAIDO, UNKNOWN");
    }
}
