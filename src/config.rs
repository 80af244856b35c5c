use crate::auth::Credentials;
use crate::export::{ExportOptions, Locale};
use crate::feeds::twitter::DEFAULT_API_BASE;
use crate::feeds::TimelineQuery;
use crate::filter::{FilterCriteria, FilterPolicy};
use crate::geocode::{DEFAULT_RADIUS_KM, NOMINATIM_ENDPOINT};
use crate::sentiment::LexiconScorer;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONSUMER_KEY: &str = "FEEDSENT_CONSUMER_KEY";
pub const ENV_CONSUMER_SECRET: &str = "FEEDSENT_CONSUMER_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "FEEDSENT_ACCESS_TOKEN";
pub const ENV_ACCESS_TOKEN_SECRET: &str = "FEEDSENT_ACCESS_TOKEN_SECRET";

/// Upper bound the v1.1 timeline accepts for `count`.
const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: Credentials,
    pub timeline: TimelineConfig,
    pub filter: FilterConfig,
    pub geocode: GeocodeConfig,
    pub output: OutputConfig,
    pub sentiment: SentimentConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub user: String,
    /// Maximum number of posts to fetch; unbounded when unset.
    pub limit: Option<usize>,
    pub page_size: usize,
    pub since_id: Option<u64>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            limit: None,
            page_size: MAX_PAGE_SIZE,
            since_id: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub policy: FilterPolicy,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub location: Option<String>,
    pub keywords: Vec<String>,
    pub case_sensitive: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            policy: FilterPolicy::default(),
            since: None,
            until: None,
            location: None,
            keywords: Vec::new(),
            case_sensitive: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Place to resolve into a server-side `geocode` parameter.
    pub place: Option<String>,
    pub radius_km: u32,
    /// When false, an unresolved place only drops the parameter.
    pub required: bool,
    pub endpoint: String,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            place: None,
            radius_km: DEFAULT_RADIUS_KM,
            required: true,
            endpoint: NOMINATIM_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub include_url: bool,
    pub permalink_host: String,
    pub locale: Locale,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tweets.csv"),
            include_url: false,
            permalink_host: "twitter.com".to_string(),
            locale: Locale::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Extra or overriding word polarities.
    pub words: BTreeMap<String, f64>,
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub user: Option<String>,
    pub limit: Option<usize>,
    pub output: Option<PathBuf>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub keywords: Vec<String>,
    pub location: Option<String>,
    pub policy: Option<FilterPolicy>,
    pub place: Option<String>,
    pub locale: Option<Locale>,
    pub include_url: bool,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("feedsent").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load `path` if given, else the default location if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Non-empty credential variables replace whatever the file held.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let creds = &mut self.credentials;
        for (key, slot) in [
            (ENV_CONSUMER_KEY, &mut creds.consumer_key),
            (ENV_CONSUMER_SECRET, &mut creds.consumer_secret),
            (ENV_ACCESS_TOKEN, &mut creds.access_token),
            (ENV_ACCESS_TOKEN_SECRET, &mut creds.access_token_secret),
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(user) = overrides.user {
            self.timeline.user = user;
        }
        if overrides.limit.is_some() {
            self.timeline.limit = overrides.limit;
        }
        if let Some(path) = overrides.output {
            self.output.path = path;
        }
        if overrides.since.is_some() {
            self.filter.since = overrides.since;
        }
        if overrides.until.is_some() {
            self.filter.until = overrides.until;
        }
        if !overrides.keywords.is_empty() {
            self.filter.keywords = overrides.keywords;
        }
        if overrides.location.is_some() {
            self.filter.location = overrides.location;
        }
        if let Some(policy) = overrides.policy {
            self.filter.policy = policy;
        }
        if overrides.place.is_some() {
            self.geocode.place = overrides.place;
        }
        if let Some(locale) = overrides.locale {
            self.output.locale = locale;
        }
        if overrides.include_url {
            self.output.include_url = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.credentials.missing();
        if !missing.is_empty() {
            bail!(
                "missing credentials: {} (set them in [credentials] or via FEEDSENT_* variables)",
                missing.join(", ")
            );
        }

        let user = self.timeline.user.trim().trim_start_matches('@');
        if user.is_empty() {
            bail!("timeline.user must name the account to fetch");
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.timeline.page_size) {
            bail!(
                "timeline.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.timeline.page_size
            );
        }

        if self.keywords().is_empty() {
            bail!("filter.keywords must contain at least one keyword");
        }

        if let (Some(since), Some(until)) = (self.filter.since, self.filter.until) {
            if since > until {
                bail!("filter.since ({}) is after filter.until ({})", since, until);
            }
        }

        if self.geocode.place.is_some() && self.geocode.radius_km == 0 {
            bail!("geocode.radius_km must be greater than zero");
        }

        if let Some((word, score)) = self
            .sentiment
            .words
            .iter()
            .find(|(_, score)| !score.is_finite())
        {
            bail!("sentiment.words.{} must be a finite number, got {}", word, score);
        }

        Ok(())
    }

    fn keywords(&self) -> Vec<String> {
        self.filter
            .keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .cloned()
            .collect()
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            since: self.filter.since,
            until: self.filter.until,
            location: self.filter.location.clone(),
            keywords: self.keywords(),
            case_sensitive: self.filter.case_sensitive,
            policy: self.filter.policy,
        }
    }

    /// Timeline query without the geocode, which needs a network lookup.
    pub fn query(&self) -> TimelineQuery {
        TimelineQuery {
            screen_name: self.timeline.user.trim().trim_start_matches('@').to_string(),
            page_size: self.timeline.page_size,
            since_id: self.timeline.since_id,
            geocode: None,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            include_url: self.output.include_url,
            permalink_host: self.output.permalink_host.clone(),
            locale: self.output.locale,
        }
    }

    pub fn scorer(&self) -> LexiconScorer {
        LexiconScorer::new().with_words(
            self.sentiment
                .words
                .iter()
                .map(|(word, score)| (word.as_str(), *score)),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeline.timeout_secs)
    }
}
