//! Weather lookup for recommendation context
//!
//! Queries wttr.in for the current conditions of a city. The engine
//! consumes this through the `WeatherLookup` capability and substitutes
//! a mild default when the provider is absent or failing, so weather
//! can flavor a recommendation but never block one.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Public weather endpoint
const WTTR_BASE_URL: &str = "https://wttr.in";

/// Request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Cities picked at random when the caller names none
const DEFAULT_CITIES: [&str; 2] = ["Shanghai", "Beijing"];

/// Cities recognized in free-form query text
const KNOWN_CITIES: [&str; 20] = [
    "Beijing",
    "Shanghai",
    "Guangzhou",
    "Shenzhen",
    "Chengdu",
    "Chongqing",
    "Hangzhou",
    "Wuhan",
    "Xian",
    "Nanjing",
    "Tianjin",
    "Suzhou",
    "Changsha",
    "Qingdao",
    "Xiamen",
    "Kunming",
    "Harbin",
    "Dalian",
    "Lanzhou",
    "Guiyang",
];

/// Current conditions for a resolved city
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReport {
    /// Temperature in degrees Celsius
    pub temperature_c: i32,
    /// Short description like "Partly cloudy"
    pub description: String,
    /// City the report is for
    pub city: String,
}

impl WeatherReport {
    /// Mild default used when no provider answered
    pub fn fallback(city: impl Into<String>) -> Self {
        Self {
            temperature_c: 20,
            description: "Clear".to_string(),
            city: city.into(),
        }
    }

    /// True when the report suggests rain or snow
    pub fn is_wet(&self) -> bool {
        let desc = self.description.to_lowercase();
        ["rain", "drizzle", "shower", "snow", "sleet", "thunder"]
            .iter()
            .any(|w| desc.contains(w))
    }
}

/// Weather lookup capability
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    /// Look up current conditions, resolving the city if none is given
    async fn lookup(&self, city: Option<&str>) -> Result<WeatherReport>;
}

/// wttr.in backed weather client
#[derive(Debug, Clone)]
pub struct WttrClient {
    http_client: HttpClient,
    base_url: String,
}

impl WttrClient {
    /// Create a client against the public wttr.in endpoint
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::Transport)?;

        Ok(Self {
            http_client,
            base_url: WTTR_BASE_URL.to_string(),
        })
    }

    /// Override the endpoint URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl WeatherLookup for WttrClient {
    async fn lookup(&self, city: Option<&str>) -> Result<WeatherReport> {
        let city = match city {
            Some(c) => c.to_string(),
            None => default_city(),
        };

        let url = format!("{}/{city}?format=j1", self.base_url);
        debug!(city = %city, "fetching weather");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Weather(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Weather(format!("HTTP {} for {city}", status.as_u16())));
        }

        let data: WttrResponse = response
            .json()
            .await
            .map_err(|e| Error::Weather(format!("malformed response: {e}")))?;

        let current = data
            .current_condition
            .into_iter()
            .next()
            .ok_or_else(|| Error::Weather("no current conditions in response".to_string()))?;

        // wttr.in reports the temperature as a string.
        let temperature_c = current.temp_c.parse().unwrap_or(20);
        let description = current
            .weather_desc
            .into_iter()
            .next()
            .map(|d| d.value)
            .unwrap_or_else(|| "Clear".to_string());

        Ok(WeatherReport {
            temperature_c,
            description,
            city,
        })
    }
}

/// Pick a default city when the caller named none
fn default_city() -> String {
    DEFAULT_CITIES
        .choose(&mut rand::thread_rng())
        .unwrap_or(&DEFAULT_CITIES[0])
        .to_string()
}

/// Scan free-form text for a known city name
pub fn detect_city(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    KNOWN_CITIES
        .iter()
        .find(|city| lower.contains(&city.to_lowercase()))
        .map(|city| city.to_string())
}

#[derive(Debug, Deserialize)]
struct WttrResponse {
    #[serde(default)]
    current_condition: Vec<CurrentCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<WeatherDesc>,
}

#[derive(Debug, Deserialize)]
struct WeatherDesc {
    value: String,
}
