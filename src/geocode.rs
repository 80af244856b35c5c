use crate::error::{FeedError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_RADIUS_KM: u32 = 1000;

/// Center point and radius, rendered as `"lat, lon, Nkm"` for the timeline query.
///
/// Only constructible from finite, in-range coordinates, so an unresolved
/// place can never leak into a request as a placeholder string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodeString {
    latitude: f64,
    longitude: f64,
    radius_km: u32,
}

impl GeocodeString {
    pub fn new(latitude: f64, longitude: f64, radius_km: u32) -> Result<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(FeedError::GeocodeNotFound(format!(
                "invalid coordinates ({}, {})",
                latitude, longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            radius_km,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn radius_km(&self) -> u32 {
        self.radius_km
    }
}

impl fmt::Display for GeocodeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}km",
            self.latitude, self.longitude, self.radius_km
        )
    }
}

/// Turns a free-text place name into a search area.
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, place: &str, radius_km: u32) -> Result<GeocodeString>;
}

/// Resolves free-text place names through a Nominatim-compatible endpoint.
pub struct Geocoder {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl Geocoder {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("feedsent/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub async fn lookup(&self, place: &str, radius_km: u32) -> Result<GeocodeString> {
        if place.trim().is_empty() {
            return Err(FeedError::GeocodeNotFound("empty place name".to_string()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FeedError::from_status(status, body));
        }

        let geocode = parse_places(&body, place, radius_km)?;
        tracing::debug!(place, %geocode, "resolved place");
        Ok(geocode)
    }
}

#[async_trait]
impl PlaceResolver for Geocoder {
    async fn resolve(&self, place: &str, radius_km: u32) -> Result<GeocodeString> {
        self.lookup(place, radius_km).await
    }
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new(NOMINATIM_ENDPOINT, Duration::from_secs(30))
    }
}

fn parse_places(body: &str, place: &str, radius_km: u32) -> Result<GeocodeString> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)?;
    let not_found = || FeedError::GeocodeNotFound(place.to_string());

    let first = places.into_iter().next().ok_or_else(not_found)?;
    let latitude = first
        .lat
        .as_deref()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or_else(not_found)?;
    let longitude = first
        .lon
        .as_deref()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or_else(not_found)?;

    if let Some(name) = &first.display_name {
        tracing::trace!("{} matched {}", place, name);
    }

    GeocodeString::new(latitude, longitude, radius_km)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let geocode = GeocodeString::new(31.2639, -98.5456, DEFAULT_RADIUS_KM).unwrap();
        assert_eq!(geocode.to_string(), "31.2639, -98.5456, 1000km");
    }

    #[test]
    fn test_rejects_non_finite_coordinates() {
        assert!(GeocodeString::new(f64::NAN, 0.0, 1000).is_err());
        assert!(GeocodeString::new(0.0, f64::INFINITY, 1000).is_err());
        assert!(GeocodeString::new(91.0, 0.0, 1000).is_err());
        assert!(GeocodeString::new(0.0, -181.0, 1000).is_err());
    }

    #[test]
    fn test_parse_places_first_match() {
        let body = r#"[
            {"lat": "31.2638905", "lon": "-98.5456116", "display_name": "Texas, United States"},
            {"lat": "1.0", "lon": "2.0", "display_name": "Elsewhere"}
        ]"#;
        let geocode = parse_places(body, "Texas", 1000).unwrap();
        assert_eq!(geocode.latitude(), 31.2638905);
        assert_eq!(geocode.longitude(), -98.5456116);
        assert_eq!(geocode.radius_km(), 1000);
    }

    #[test]
    fn test_unresolved_place_is_not_found() {
        let err = parse_places("[]", "Atlantis", 1000).unwrap_err();
        match err {
            FeedError::GeocodeNotFound(place) => assert_eq!(place, "Atlantis"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_coordinates_never_render_placeholder() {
        let body = r#"[{"display_name": "Nowhere"}]"#;
        let result = parse_places(body, "Nowhere", 1000);
        assert!(matches!(result, Err(FeedError::GeocodeNotFound(_))));

        let body = r#"[{"lat": "None", "lon": "None"}]"#;
        let result = parse_places(body, "Nowhere", 1000);
        assert!(matches!(result, Err(FeedError::GeocodeNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_place_name_fails_without_request() {
        let geocoder = Geocoder::new("http://127.0.0.1:9/search", Duration::from_millis(10));
        let err = geocoder.lookup("   ", 1000).await.unwrap_err();
        assert!(matches!(err, FeedError::GeocodeNotFound(_)));
    }
}
