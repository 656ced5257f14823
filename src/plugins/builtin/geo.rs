//! Host/IP geolocation over a freegeoip-style JSON API

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::application::errors::PluginResult;
use crate::infrastructure::config::GeoConfig;
use crate::plugins::trait_def::{Argument, Plugin};

const USAGE: &str = "Usage: !geo <hostname or IP>";

/// Fields of a lookup record that make it into the reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeoRecord {
    pub ip: String,
    pub city: String,
    pub region_name: String,
    pub country_name: String,
}

impl GeoRecord {
    /// `city, region, country (ip)` with empty parts left out
    fn render(&self) -> String {
        let place: Vec<&str> = [&self.city, &self.region_name, &self.country_name]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();

        let mut out = place.join(", ");
        if !self.ip.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&format!("({})", self.ip));
        }
        out
    }
}

/// Result of one lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoLookup {
    Found(GeoRecord),
    Status(u16),
    /// A success status whose body is not a usable record; holds the raw body
    Invalid(String),
}

impl GeoLookup {
    /// Classify a finished HTTP exchange
    pub fn from_response(status: u16, body: &str) -> Self {
        if !(200..300).contains(&status) {
            return GeoLookup::Status(status);
        }

        match serde_json::from_str::<GeoRecord>(body) {
            Ok(record) if !record.render().is_empty() => GeoLookup::Found(record),
            _ => GeoLookup::Invalid(body.to_string()),
        }
    }

    /// Human-readable form sent back to the chat
    pub fn describe(&self) -> String {
        match self {
            GeoLookup::Status(404) => "unknown".to_string(),
            GeoLookup::Status(403) => "geolocation API rate limit exceeded.".to_string(),
            GeoLookup::Status(code) => format!("geolocation lookup failed (HTTP {})", code),
            GeoLookup::Found(record) => record.render(),
            GeoLookup::Invalid(body) => format!(
                "Invalid response from the geolocation API. The response was: {}",
                body
            ),
        }
    }
}

pub struct GeoPlugin {
    client: Client,
    endpoint: String,
}

impl GeoPlugin {
    pub fn new(config: &GeoConfig) -> PluginResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn lookup(&self, host: &str) -> PluginResult<GeoLookup> {
        let url = format!("{}{}", self.endpoint, host);
        debug!("Geo lookup: {}", url);

        let response = self.client.get(&url).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(GeoLookup::from_response(status, &body))
    }
}

impl Plugin for GeoPlugin {
    fn name(&self) -> Option<&str> {
        Some("geo")
    }

    fn description(&self) -> &str {
        "Geolocate a hostname or IP address"
    }

    fn usage(&self) -> Option<&str> {
        Some("Type !geo <hostname or IP address> to geolocate a host.")
    }

    fn run(&self, argument: Argument) -> PluginResult<String> {
        let host = argument.text().trim();
        if host.is_empty() {
            return Ok(USAGE.to_string());
        }
        Ok(self.lookup(host)?.describe())
    }
}
