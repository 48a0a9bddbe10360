use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

pub const OMDB_API_BASE: &str = "https://www.omdbapi.com/";
pub const PAGE_SIZE: usize = 10;
pub const PLACEHOLDER_POSTER: &str = "no-movie.png";
pub const NOT_AVAILABLE: &str = "N/A";

const GENERIC_FAILURE: &str = "Error fetching movies. Please try again later.";
const UPSTREAM_FAILURE: &str = "Failed to fetch movies";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: OMDB_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: format!("reel-tui/{}", crate::VERSION),
            http_client: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OmdbError {
    #[error("omdb: request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("omdb: unexpected status {0}")]
    Status(StatusCode),
    #[error("omdb: {}", .0.as_deref().unwrap_or(UPSTREAM_FAILURE))]
    Upstream(Option<String>),
    #[error("omdb: decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl OmdbError {
    /// Text shown to the user in place of the result list.
    pub fn user_message(&self) -> String {
        match self {
            OmdbError::Upstream(Some(message)) if !message.trim().is_empty() => message.clone(),
            OmdbError::Upstream(_) => UPSTREAM_FAILURE.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poster {
    Url(String),
    Placeholder,
}

impl Poster {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() && value != NOT_AVAILABLE => {
                Poster::Url(value.to_string())
            }
            _ => Poster::Placeholder,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Poster::Url(url) => url,
            Poster::Placeholder => PLACEHOLDER_POSTER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub id: String,
    pub title: String,
    pub year: String,
    pub poster: Poster,
    pub media_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub items: Vec<ResultItem>,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub id: String,
    pub title: String,
    pub year: String,
    pub rated: String,
    pub released: String,
    pub runtime: String,
    pub genre: String,
    pub director: String,
    pub plot: String,
    pub language: String,
    pub country: String,
    pub poster: Poster,
    pub imdb_rating: String,
    pub dvd: String,
    pub box_office: String,
    pub production: String,
    pub website: String,
}

impl DetailRecord {
    pub fn rating(&self) -> Option<&str> {
        available(&self.imdb_rating)
    }

    pub fn primary_language(&self) -> Option<&str> {
        available(&self.language)
            .and_then(|langs| langs.split(',').map(str::trim).find(|lang| !lang.is_empty()))
    }

    pub fn genres(&self) -> Vec<&str> {
        available(&self.genre)
            .map(|genre| {
                genre
                    .split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn release_status(&self) -> &'static str {
        if self.dvd.trim() == NOT_AVAILABLE {
            "Unknown"
        } else {
            "Released"
        }
    }

    pub fn website_url(&self) -> Option<&str> {
        available(&self.website)
    }
}

/// Returns `None` for OMDb's "N/A" marker and blank values.
pub fn available(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
        None
    } else {
        Some(trimmed)
    }
}

pub fn parse_total(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return 0;
    };
    match raw.trim().parse::<usize>() {
        Ok(total) => total,
        Err(err) => {
            debug!(raw, %err, "omdb: unparseable totalResults, treating as 0");
            0
        }
    }
}

pub struct Client {
    http: HttpClient,
    api_key: String,
    base_url: String,
    user_agent: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("omdb client api key required");
        }
        if config.user_agent.trim().is_empty() {
            bail!("omdb client user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder().timeout(config.timeout).build()?,
        };

        Ok(Client {
            http,
            api_key: config.api_key.trim().to_string(),
            base_url: config.base_url,
            user_agent: config.user_agent,
        })
    }

    pub fn search(&self, query: &str, page: u32) -> Result<SearchPage, OmdbError> {
        debug!(query, page, "omdb: search");
        let page_param = page.to_string();
        let body = self.get(&[("s", query), ("page", page_param.as_str())])?;
        let wire: SearchResponse = serde_json::from_str(&body)?;
        wire.into_page()
    }

    /// Fetches the full record for one title. `Ok(None)` means OMDb has no
    /// entry for the id.
    pub fn details(&self, id: &str) -> Result<Option<DetailRecord>, OmdbError> {
        debug!(id, "omdb: details");
        let body = self.get(&[("i", id), ("plot", "full")])?;
        let wire: DetailResponse = serde_json::from_str(&body)?;
        Ok(wire.into_record(id))
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<String, OmdbError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .header(USER_AGENT, &self.user_agent)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(OmdbError::Status(status));
        }
        Ok(response.text()?)
    }
}

fn is_true(flag: &str) -> bool {
    flag.eq_ignore_ascii_case("true")
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Response", default)]
    response: String,
    #[serde(rename = "Search", default)]
    search: Option<Vec<WireItem>>,
    #[serde(rename = "totalResults", default)]
    total_results: Option<String>,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

impl SearchResponse {
    fn into_page(self) -> Result<SearchPage, OmdbError> {
        if !is_true(&self.response) {
            return Err(OmdbError::Upstream(self.error));
        }
        Ok(SearchPage {
            total_count: parse_total(self.total_results.as_deref()),
            items: self
                .search
                .unwrap_or_default()
                .into_iter()
                .map(WireItem::into_item)
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireItem {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "Poster", default)]
    poster: Option<String>,
    #[serde(rename = "Type", default)]
    kind: String,
}

impl WireItem {
    fn into_item(self) -> ResultItem {
        ResultItem {
            poster: Poster::from_raw(self.poster.as_deref()),
            id: self.imdb_id,
            title: self.title,
            year: self.year,
            media_type: self.kind,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetailResponse {
    #[serde(default)]
    response: String,
    #[serde(rename = "imdbID", default)]
    imdb_id: Option<String>,
    title: Option<String>,
    year: Option<String>,
    rated: Option<String>,
    released: Option<String>,
    runtime: Option<String>,
    genre: Option<String>,
    director: Option<String>,
    plot: Option<String>,
    language: Option<String>,
    country: Option<String>,
    poster: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "DVD")]
    dvd: Option<String>,
    box_office: Option<String>,
    production: Option<String>,
    website: Option<String>,
}

impl DetailResponse {
    fn into_record(self, requested_id: &str) -> Option<DetailRecord> {
        if !is_true(&self.response) {
            return None;
        }
        let field = |value: Option<String>| value.unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Some(DetailRecord {
            id: self
                .imdb_id
                .unwrap_or_else(|| requested_id.to_string()),
            poster: Poster::from_raw(self.poster.as_deref()),
            title: field(self.title),
            year: field(self.year),
            rated: field(self.rated),
            released: field(self.released),
            runtime: field(self.runtime),
            genre: field(self.genre),
            director: field(self.director),
            plot: field(self.plot),
            language: field(self.language),
            country: field(self.country),
            imdb_rating: field(self.imdb_rating),
            dvd: field(self.dvd),
            box_office: field(self.box_office),
            production: field(self.production),
            website: field(self.website),
        })
    }
}
