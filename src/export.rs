//! CSV output.
//!
//! The destination is truncated when the exporter is created and the header
//! is written straight away. Every row is flushed as soon as it is written, so
//! a run that dies halfway leaves a valid file with the rows accepted so far.

use crate::feeds::Post;
use crate::sentiment::SentimentLabel;
use anyhow::{Context, Result};
use csv::Writer;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Language of the header row and sentiment labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    pub fn header(&self, include_url: bool) -> Vec<&'static str> {
        let mut columns = match self {
            Locale::Es => vec!["Fecha", "Tweet", "Usuario", "Sentimiento"],
            Locale::En => vec!["Date", "Tweet", "User", "Sentiment"],
        };
        if include_url {
            columns.push("URL");
        }
        columns
    }

    pub fn label(&self, label: SentimentLabel) -> &'static str {
        match (self, label) {
            (Locale::Es, SentimentLabel::Positive) => "Positivo",
            (Locale::Es, SentimentLabel::Neutral) => "Neutro",
            (Locale::Es, SentimentLabel::Negative) => "Negativo",
            (Locale::En, SentimentLabel::Positive) => "Positive",
            (Locale::En, SentimentLabel::Neutral) => "Neutral",
            (Locale::En, SentimentLabel::Negative) => "Negative",
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Locale::Es),
            "en" => Ok(Locale::En),
            other => Err(format!("unsupported locale '{}' (expected es or en)", other)),
        }
    }
}

/// A post after cleaning and scoring, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPost {
    pub post: Post,
    pub cleaned_text: String,
    pub polarity: f64,
    pub label: SentimentLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub include_url: bool,
    pub permalink_host: String,
    pub locale: Locale,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_url: false,
            permalink_host: "twitter.com".to_string(),
            locale: Locale::Es,
        }
    }
}

pub struct CsvExporter {
    writer: Writer<File>,
    options: ExportOptions,
    rows: usize,
}

impl CsvExporter {
    /// Create (or truncate) `path` and write the header row.
    pub fn create(path: &Path, options: ExportOptions) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        writer
            .write_record(options.locale.header(options.include_url))
            .context("Failed to write CSV header")?;
        writer.flush()?;

        Ok(Self {
            writer,
            options,
            rows: 0,
        })
    }

    pub fn write(&mut self, scored: &ScoredPost) -> Result<()> {
        let mut record = vec![
            scored.post.created_at.format(DATE_FORMAT).to_string(),
            scored.cleaned_text.clone(),
            scored.post.author.clone(),
            self.options.locale.label(scored.label).to_string(),
        ];
        if self.options.include_url {
            record.push(scored.post.permalink(&self.options.permalink_host));
        }

        self.writer
            .write_record(&record)
            .with_context(|| format!("Failed to write row for post {}", scored.post.id))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}
