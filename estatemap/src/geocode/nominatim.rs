//! Nominatim (OpenStreetMap) geocoding provider.
//!
//! Issues `GET <base>/search?q=<address>&format=jsonv2&limit=1` and takes
//! the first match. The public instance allows roughly one request per
//! second; the resolver's admission cap and post-success cooldown keep a
//! batch inside that ceiling.

use super::{GeocodeError, Geocoder};
use crate::coord::Coordinate;
use crate::http::AsyncHttpClient;
use serde::Deserialize;
use tracing::debug;

/// Default public Nominatim endpoint.
const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Geocoder backed by a Nominatim search endpoint.
#[derive(Clone)]
pub struct NominatimGeocoder<C> {
    client: C,
    base_url: String,
}

/// One search result. Nominatim serializes coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl<C: AsyncHttpClient> NominatimGeocoder<C> {
    /// Creates a geocoder against the public Nominatim instance.
    pub fn new(client: C) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    /// Creates a geocoder against a custom instance (self-hosted or stub).
    pub fn with_base_url(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn search_url(&self, address: &str) -> Result<String, GeocodeError> {
        let mut url = reqwest::Url::parse(&format!("{}/search", self.base_url))
            .map_err(|e| GeocodeError::Provider(format!("invalid base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "jsonv2")
            .append_pair("limit", "1");
        Ok(url.into())
    }
}

impl<C: AsyncHttpClient> Geocoder for NominatimGeocoder<C> {
    async fn resolve(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let url = self.search_url(address)?;
        let body = self.client.get(&url).await?;

        let places: Vec<Place> = serde_json::from_slice(&body)
            .map_err(|e| GeocodeError::Decode(e.to_string()))?;

        let Some(place) = places.into_iter().next() else {
            debug!(address = address, "no geocode match");
            return Ok(None);
        };

        let latitude: f64 = place
            .lat
            .parse()
            .map_err(|_| GeocodeError::Decode(format!("bad latitude: {}", place.lat)))?;
        let longitude: f64 = place
            .lon
            .parse()
            .map_err(|_| GeocodeError::Decode(format!("bad longitude: {}", place.lon)))?;

        let coordinate = Coordinate::new(latitude, longitude)
            .map_err(|e| GeocodeError::Decode(e.to_string()))?;

        debug!(address = address, coordinate = %coordinate, "geocode match");
        Ok(Some(coordinate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;
    use crate::http::HttpError;

    fn geocoder(body: &str) -> NominatimGeocoder<MockHttpClient> {
        NominatimGeocoder::new(MockHttpClient {
            response: Ok(body.as_bytes().to_vec()),
        })
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let g = geocoder(r#"[{"lat": "35.6595", "lon": "139.7005"}]"#);
        let coord = g.resolve("東京都渋谷区1-2-3").await.unwrap().unwrap();
        assert!((coord.latitude - 35.6595).abs() < 1e-9);
        assert!((coord.longitude - 139.7005).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_resolve_no_match_returns_none() {
        let g = geocoder("[]");
        let result = g.resolve("nowhere at all").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_resolve_malformed_body() {
        let g = geocoder("not json");
        let err = g.resolve("anywhere").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_resolve_bad_coordinate_string() {
        let g = geocoder(r#"[{"lat": "abc", "lon": "139.7"}]"#);
        let err = g.resolve("anywhere").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Decode(_)));
    }

    #[tokio::test]
    async fn test_resolve_http_error_propagates() {
        let g = NominatimGeocoder::new(MockHttpClient {
            response: Err(HttpError::Request("refused".to_string())),
        });
        let err = g.resolve("anywhere").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Http(_)));
    }

    #[test]
    fn test_search_url_encodes_query() {
        let g = geocoder("[]");
        let url = g.search_url("1 Main St, Tokyo").unwrap();
        assert!(url.starts_with("https://nominatim.openstreetmap.org/search?"));
        assert!(url.contains("format=jsonv2"));
        assert!(url.contains("limit=1"));
        assert!(!url.contains(' '));
    }
}
