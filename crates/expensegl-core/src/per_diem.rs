//! Per diem (M&IE) rate lookup
//!
//! A location is either a ZIP code or a "City, ST" string. ZIP lookups try
//! the rate API's ZIP endpoint first and fall back to geocoding the ZIP and
//! asking the city endpoint. The daily rate is then dug out of whatever JSON
//! comes back with [`find_daily_rate`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PerDiemSettings;
use crate::error::{Error, Result};
use crate::extract::{find_daily_rate, value_text};
use crate::location::{city_path_segment, extract_zip, fiscal_year, parse_city_state};

const RATE_TIMEOUT: Duration = Duration::from_secs(15);
const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

const LOCATION_HINT: &str = "Use a 5-digit ZIP or City, State (e.g. Denver, CO).";

/// Response from the rate API; `body` is set only for HTTP 200
#[derive(Debug, Clone, PartialEq)]
pub struct RateResponse {
    pub status: u16,
    pub body: Option<Value>,
}

/// Per diem rate API
#[async_trait]
pub trait PerDiemApi: Send + Sync {
    /// GET a path relative to the API base, e.g. `rates/zip/80202/year/2026`
    async fn get_rates(&self, path: &str) -> Result<RateResponse>;
}

/// ZIP → (city, state abbreviation)
#[async_trait]
pub trait ZipGeocoder: Send + Sync {
    async fn place_for_zip(&self, zip: &str) -> Result<(String, String)>;
}

#[derive(Clone)]
pub struct HttpPerDiemApi {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl HttpPerDiemApi {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl PerDiemApi for HttpPerDiemApi {
    async fn get_rates(&self, path: &str) -> Result<RateResponse> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .header("x-api-key", &self.api_key)
            .query(&[("api_key", &self.api_key)])
            .timeout(RATE_TIMEOUT)
            .send()
            .await?;

        let status = response.status().as_u16();
        debug!(url = %url, status, "Per diem API response");
        if status != 200 {
            return Ok(RateResponse { status, body: None });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|_| Error::Upstream("Per diem API returned invalid JSON.".to_string()))?;
        Ok(RateResponse {
            status,
            body: Some(body),
        })
    }
}

#[derive(Clone)]
pub struct HttpZipGeocoder {
    http_client: Client,
    base_url: String,
}

impl HttpZipGeocoder {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ZipGeocoder for HttpZipGeocoder {
    async fn place_for_zip(&self, zip: &str) -> Result<(String, String)> {
        let response = self
            .http_client
            .get(format!("{}/{}", self.base_url, zip))
            .timeout(GEOCODE_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "ZIP geocode failed (HTTP {}).",
                status.as_u16()
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|_| Error::Upstream("ZIP geocode returned invalid JSON.".to_string()))?;
        place_from_geocode(&data)
    }
}

/// First place of a geocoder response as (city, state abbreviation)
pub fn place_from_geocode(data: &Value) -> Result<(String, String)> {
    let place = data
        .get("places")
        .and_then(Value::as_array)
        .and_then(|p| p.first())
        .filter(|p| p.is_object())
        .ok_or_else(|| Error::Upstream("ZIP geocode returned no places.".to_string()))?;

    let field = |keys: &[&str]| keys.iter().find_map(|k| place.get(*k).and_then(value_text));
    match (field(&["place name", "place"]), field(&["state abbreviation", "state"])) {
        (Some(city), Some(state)) => Ok((city, state)),
        _ => Err(Error::Upstream(
            "ZIP geocode response missing state/city.".to_string(),
        )),
    }
}

/// In-memory rate API for tests: path → body; unknown paths are 404
#[derive(Debug, Clone, Default)]
pub struct MockPerDiemApi {
    pub responses: HashMap<String, Value>,
}

impl MockPerDiemApi {
    pub fn with(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), body);
        self
    }
}

#[async_trait]
impl PerDiemApi for MockPerDiemApi {
    async fn get_rates(&self, path: &str) -> Result<RateResponse> {
        Ok(match self.responses.get(path) {
            Some(body) => RateResponse {
                status: 200,
                body: Some(body.clone()),
            },
            None => RateResponse {
                status: 404,
                body: None,
            },
        })
    }
}

/// In-memory geocoder for tests
#[derive(Debug, Clone, Default)]
pub struct MockZipGeocoder {
    pub places: HashMap<String, (String, String)>,
}

#[async_trait]
impl ZipGeocoder for MockZipGeocoder {
    async fn place_for_zip(&self, zip: &str) -> Result<(String, String)> {
        self.places
            .get(zip)
            .cloned()
            .ok_or_else(|| Error::Upstream("ZIP geocode failed (HTTP 404).".to_string()))
    }
}

/// Where the traveller is going
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerDiemLocation {
    Zip(String),
    City { city: String, state: String },
}

impl PerDiemLocation {
    /// A 5-digit ZIP anywhere in the text wins; otherwise "City, ST"
    pub fn parse(text: &str) -> Result<Self> {
        if let Some(zip) = extract_zip(text) {
            return Ok(Self::Zip(zip));
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidData(
                "Provide a 5-digit ZIP or City, State (e.g. Denver, CO).".to_string(),
            ));
        }

        parse_city_state(text)
            .map(|(city, state)| Self::City {
                city,
                state: state.to_string(),
            })
            .ok_or_else(|| Error::InvalidData(format!("Could not parse location '{text}'. {LOCATION_HINT}")))
    }
}

/// One rate API request, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateAttempt {
    pub path: String,
    pub status: u16,
}

/// Strategies tried for a location, in order
#[derive(Debug, Clone, PartialEq, Eq)]
enum RateStrategy {
    ZipEndpoint(String),
    GeocodedCity(String),
    CityEndpoint { city: String, state: String },
}

enum RateOutcome {
    Found(Value),
    Miss,
    Failed(Error),
}

/// A resolved per diem rate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerDiemQuote {
    /// Empty for city lookups
    pub zip_code: String,
    pub fiscal_year: i32,
    pub travel_date: Option<NaiveDate>,
    pub mie_rate: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<RateAttempt>,
}

#[derive(Clone)]
pub struct PerDiemService {
    api: Arc<dyn PerDiemApi>,
    geocoder: Arc<dyn ZipGeocoder>,
}

impl PerDiemService {
    pub fn new(api: Arc<dyn PerDiemApi>, geocoder: Arc<dyn ZipGeocoder>) -> Self {
        Self { api, geocoder }
    }

    /// HTTP clients from settings; `None` without an API key
    pub fn from_settings(settings: &PerDiemSettings) -> Option<Self> {
        if settings.api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(
            Arc::new(HttpPerDiemApi::new(&settings.base_url, settings.api_key.trim())),
            Arc::new(HttpZipGeocoder::new(&settings.zip_geocode_base_url)),
        ))
    }

    /// Look up the daily M&IE rate.
    ///
    /// The fiscal year comes from the travel date, or from `today` when no
    /// date was given.
    pub async fn lookup(
        &self,
        location: &PerDiemLocation,
        travel_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<PerDiemQuote> {
        let fy = fiscal_year(travel_date.unwrap_or(today));

        let strategies = match location {
            PerDiemLocation::Zip(zip) => vec![
                RateStrategy::ZipEndpoint(zip.clone()),
                RateStrategy::GeocodedCity(zip.clone()),
            ],
            PerDiemLocation::City { city, state } => vec![RateStrategy::CityEndpoint {
                city: city.clone(),
                state: state.clone(),
            }],
        };

        let mut attempts = Vec::new();
        let mut body = None;
        for strategy in &strategies {
            match self.run(strategy, fy, &mut attempts).await {
                RateOutcome::Found(b) => {
                    body = Some(b);
                    break;
                }
                RateOutcome::Miss => continue,
                RateOutcome::Failed(e) => return Err(e),
            }
        }

        let Some(body) = body else {
            let status = attempts.first().map(|a| a.status).unwrap_or(0);
            return Err(Error::Upstream(match location {
                PerDiemLocation::Zip(_) => format!("Per diem lookup failed (HTTP {status})."),
                PerDiemLocation::City { city, state } => {
                    format!("Per diem lookup failed for {city}, {state} (HTTP {status}).")
                }
            }));
        };

        let mie_rate = find_daily_rate(&body).ok_or_else(|| {
            Error::NotFound("Unable to extract an M&IE rate from the per diem response.".to_string())
        })?;

        info!(fiscal_year = fy, mie_rate, "Per diem rate found");
        Ok(PerDiemQuote {
            zip_code: match location {
                PerDiemLocation::Zip(zip) => zip.clone(),
                PerDiemLocation::City { .. } => String::new(),
            },
            fiscal_year: fy,
            travel_date,
            mie_rate,
            attempts,
        })
    }

    async fn run(&self, strategy: &RateStrategy, fy: i32, attempts: &mut Vec<RateAttempt>) -> RateOutcome {
        let path = match strategy {
            RateStrategy::ZipEndpoint(zip) => format!("rates/zip/{zip}/year/{fy}"),
            RateStrategy::CityEndpoint { city, state } => city_path(city, state, fy),
            RateStrategy::GeocodedCity(zip) => match self.geocoder.place_for_zip(zip).await {
                Ok((city, state)) => city_path(&city, &state, fy),
                Err(e) => {
                    debug!(zip = %zip, error = %e, "ZIP geocode fallback unavailable");
                    return RateOutcome::Miss;
                }
            },
        };

        match self.api.get_rates(&path).await {
            Ok(response) => {
                attempts.push(RateAttempt {
                    path,
                    status: response.status,
                });
                match response.body {
                    Some(body) => RateOutcome::Found(body),
                    None => RateOutcome::Miss,
                }
            }
            Err(Error::Http(e)) => RateOutcome::Failed(Error::Upstream(format!(
                "Per diem request failed: {e}"
            ))),
            Err(e) => RateOutcome::Failed(e),
        }
    }
}

fn city_path(city: &str, state: &str, fy: i32) -> String {
    format!(
        "rates/city/{}/state/{}/year/{fy}",
        city_path_segment(city),
        state.trim().to_uppercase()
    )
}

/// Reject a lookup when no API key is configured
pub fn require_service(service: Option<&PerDiemService>) -> Result<&PerDiemService> {
    service.ok_or_else(|| Error::NotConfigured("GSA_API_KEY is not configured.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service(api: MockPerDiemApi, geocoder: MockZipGeocoder) -> PerDiemService {
        PerDiemService::new(Arc::new(api), Arc::new(geocoder))
    }

    fn rate_body(meals: u32) -> Value {
        json!({"rates": [{"rate": [{"city": "Denver", "meals": meals}]}]})
    }

    #[test]
    fn test_parse_location() {
        assert_eq!(PerDiemLocation::parse("80202").unwrap(), PerDiemLocation::Zip("80202".into()));
        assert_eq!(
            PerDiemLocation::parse("Denver, CO").unwrap(),
            PerDiemLocation::City { city: "Denver".into(), state: "CO".into() }
        );
        assert!(matches!(PerDiemLocation::parse("  "), Err(Error::InvalidData(_))));
        assert!(matches!(
            PerDiemLocation::parse("Atlantis"),
            Err(Error::InvalidData(ref e)) if e.contains("Atlantis")
        ));
    }

    #[tokio::test]
    async fn test_zip_endpoint() {
        let api = MockPerDiemApi::default().with("rates/zip/80202/year/2026", rate_body(79));
        let quote = service(api, MockZipGeocoder::default())
            .lookup(&PerDiemLocation::Zip("80202".into()), Some(date(2025, 10, 15)), date(2026, 1, 7))
            .await
            .unwrap();
        assert_eq!(quote.mie_rate, 79.0);
        assert_eq!(quote.fiscal_year, 2026);
        assert_eq!(quote.zip_code, "80202");
        assert_eq!(quote.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_zip_falls_back_to_geocoded_city() {
        let api = MockPerDiemApi::default()
            .with("rates/city/ST%20GEORGE/state/UT/year/2026", rate_body(68));
        let mut geocoder = MockZipGeocoder::default();
        geocoder
            .places
            .insert("84770".into(), ("St. George".into(), "ut".into()));

        let quote = service(api, geocoder)
            .lookup(&PerDiemLocation::Zip("84770".into()), None, date(2026, 1, 7))
            .await
            .unwrap();
        assert_eq!(quote.mie_rate, 68.0);
        assert_eq!(quote.attempts[0].status, 404);
        assert_eq!(quote.attempts[1].status, 200);
    }

    #[tokio::test]
    async fn test_zip_failure_reports_zip_status() {
        let err = service(MockPerDiemApi::default(), MockZipGeocoder::default())
            .lookup(&PerDiemLocation::Zip("00000".into()), None, date(2026, 1, 7))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Upstream error: Per diem lookup failed (HTTP 404).");
    }

    #[tokio::test]
    async fn test_city_lookup() {
        let api = MockPerDiemApi::default()
            .with("rates/city/SALT%20LAKE%20CITY/state/UT/year/2025", json!({"meals": 64, "incidentals": 5}));
        let location = PerDiemLocation::parse("Salt Lake City, Utah").unwrap();

        let quote = service(api.clone(), MockZipGeocoder::default())
            .lookup(&location, Some(date(2025, 3, 1)), date(2026, 1, 7))
            .await
            .unwrap();
        assert_eq!(quote.mie_rate, 69.0);
        assert_eq!(quote.zip_code, "");

        let err = service(api, MockZipGeocoder::default())
            .lookup(&location, Some(date(2025, 11, 1)), date(2026, 1, 7))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Salt Lake City, UT (HTTP 404)"));
    }

    #[tokio::test]
    async fn test_rate_missing_from_response() {
        let api = MockPerDiemApi::default().with("rates/zip/80202/year/2026", json!({"lodging": 150}));
        let err = service(api, MockZipGeocoder::default())
            .lookup(&PerDiemLocation::Zip("80202".into()), None, date(2026, 1, 7))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_place_from_geocode() {
        let data = json!({"places": [{"place name": "Denver", "state abbreviation": "CO"}]});
        assert_eq!(place_from_geocode(&data).unwrap(), ("Denver".into(), "CO".into()));
        assert!(place_from_geocode(&json!({"places": []})).is_err());
        assert!(place_from_geocode(&json!({"places": [{"place name": "Denver"}]})).is_err());
    }

    #[test]
    fn test_require_service() {
        assert!(PerDiemService::from_settings(&PerDiemSettings::default()).is_none());
        assert!(matches!(require_service(None), Err(Error::NotConfigured(_))));
    }
}
