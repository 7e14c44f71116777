// src/backend.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AhgoraError, Result};
use crate::period::PayPeriod;

pub const AHGORA_BASE_URL: &str = "https://www.ahgora.com.br";

/// The two response formats the portal exposes, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Session login plus a scraped HTML punches page.
    #[default]
    Classic,
    /// Stateless `getApuracao` JSON endpoint; credentials go with every request.
    Rest,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Classic => f.write_str("classic"),
            Backend::Rest => f.write_str("rest"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" | "http" | "html" => Ok(Backend::Classic),
            "rest" | "json" => Ok(Backend::Rest),
            other => Err(format!("unknown backend '{}', expected 'classic' or 'rest'", other)),
        }
    }
}

/// URLs of the portal pages and endpoints under a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(AhgoraError::InvalidBaseUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        Ok(Self { base })
    }

    fn join(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }

    /// Landing page of an organization; tells whether external access is enabled.
    pub fn company(&self, company_id: &str) -> String {
        self.join(&["externo", "index", company_id])
    }

    pub fn login(&self) -> String {
        self.join(&["externo", "login"])
    }

    pub fn punches(&self, period: PayPeriod) -> String {
        let page = format!("{}-{}", period.month_padded(), period.year);
        self.join(&["externo", "batidas", &page])
    }

    pub fn apuracao(&self) -> String {
        self.join(&["externo", "getApuracao"])
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base: Url::parse(AHGORA_BASE_URL).expect("AHGORA_BASE_URL is a valid URL"),
        }
    }
}
