use crate::cleaner::clean_text;
use crate::config::Config;
use crate::error::FeedError;
use crate::export::{CsvExporter, ScoredPost};
use crate::feeds::paginator::Paginator;
use crate::feeds::{Post, TimelineSource};
use crate::filter::FilterPolicy;
use crate::geocode::{GeocodeString, PlaceResolver};
use crate::report::Reporter;
use crate::sentiment::{SentimentLabel, SentimentScorer};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub accepted: usize,
    pub written: usize,
    pub output: PathBuf,
}

/// Fetch, filter, clean, score and export one user's timeline.
pub struct Pipeline<'a> {
    config: &'a Config,
    source: &'a dyn TimelineSource,
    scorer: &'a dyn SentimentScorer,
    reporter: &'a dyn Reporter,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        source: &'a dyn TimelineSource,
        scorer: &'a dyn SentimentScorer,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            source,
            scorer,
            reporter,
        }
    }

    pub fn score(&self, post: Post) -> ScoredPost {
        let cleaned_text = clean_text(&post.text);
        let polarity = self.scorer.polarity(&cleaned_text);
        ScoredPost {
            post,
            cleaned_text,
            polarity,
            label: SentimentLabel::from_polarity(polarity),
        }
    }

    /// Walk the timeline and write every accepted post as soon as it is scored.
    ///
    /// The first error aborts the run. Rows written before it stay in the file.
    pub async fn run(&self, geocode: Option<GeocodeString>) -> Result<RunSummary> {
        let criteria = self.config.criteria();
        if criteria.policy == FilterPolicy::MixedOrAnd {
            self.reporter.warn(
                "filter policy mixed-or-and accepts every post inside the date range, \
                 regardless of keyword and location",
            );
        }

        let mut query = self.config.query();
        query.geocode = geocode;
        let user = query.screen_name.clone();

        let path = &self.config.output.path;
        let mut exporter = CsvExporter::create(path, self.config.export_options())?;
        self.reporter.info(&format!("Created file: {}", path.display()));

        let mut paginator = Paginator::new(self.source, query, self.config.timeline.limit);
        let mut fetched = 0;
        let mut accepted = 0;

        while let Some(post) = paginator
            .next_post()
            .await
            .with_context(|| format!("Failed to fetch timeline of @{}", user))?
        {
            fetched += 1;
            if !criteria.accepts(&post) {
                continue;
            }
            accepted += 1;

            let scored = self.score(post);
            self.reporter.debug(&format!(
                "post {} scored {:.3} ({:?})",
                scored.post.id, scored.polarity, scored.label
            ));
            exporter.write(&scored)?;
        }

        let written = exporter.finish()?;
        self.reporter.info(&format!(
            "File {} created: {} of {} fetched posts matched across {} pages",
            path.display(),
            written,
            fetched,
            paginator.pages_fetched()
        ));

        Ok(RunSummary {
            fetched,
            accepted,
            written,
            output: path.clone(),
        })
    }
}

/// Resolve `[geocode] place`, if any.
///
/// An unknown place is fatal unless `geocode.required` is false, in which case
/// the timeline is queried without a geocode.
pub async fn resolve_geocode(
    config: &Config,
    resolver: &dyn PlaceResolver,
    reporter: &dyn Reporter,
) -> Result<Option<GeocodeString>> {
    let Some(place) = config.geocode.place.as_deref() else {
        return Ok(None);
    };

    match resolver.resolve(place, config.geocode.radius_km).await {
        Ok(geocode) => {
            reporter.info(&format!("Resolved '{}' to {}", place, geocode));
            Ok(Some(geocode))
        }
        Err(FeedError::GeocodeNotFound(reason)) if !config.geocode.required => {
            reporter.warn(&format!(
                "Could not resolve '{}' ({}); continuing without geocode",
                place, reason
            ));
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to geocode '{}'", place)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as FeedResult;
    use crate::feeds::testing::{post, MockTimeline};
    use crate::feeds::{TimelinePage, TimelineQuery};
    use crate::report::{Level, MemoryReporter};
    use crate::sentiment::LexiconScorer;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use csv::Reader;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn config(output: &Path) -> Config {
        let mut config = Config::default();
        config.timeline.user = "nasa".to_string();
        config.filter.since = NaiveDate::from_ymd_opt(2021, 1, 1);
        config.filter.until = NaiveDate::from_ymd_opt(2021, 12, 31);
        config.filter.keywords = vec!["space".to_string()];
        config.output.path = output.to_path_buf();
        config
    }

    fn three_posts() -> MockTimeline {
        MockTimeline::new(vec![
            post(1, (2021, 1, 1), "Happy new year everyone", ""),
            post(2, (2021, 6, 15), "A great day for space https://t.co/x", "Houston"),
            post(3, (2022, 12, 31), "space is hard", ""),
        ])
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        Reader::from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_strict_and_end_to_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tweets.csv");
        let config = config(&path);
        let source = three_posts();
        let scorer = LexiconScorer::new();
        let reporter = MemoryReporter::new();

        let summary = Pipeline::new(&config, &source, &scorer, &reporter)
            .run(None)
            .await
            .unwrap();

        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.written, 1);

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "2021-06-15 12:00:00+00:00");
        assert_eq!(rows[0][1], "A great day for space");
        assert_eq!(rows[0][2], "nasa");
        assert_eq!(rows[0][3], "Positivo");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(reporter.contains(Level::Info, "Created file"));
    }

    #[tokio::test]
    async fn test_mixed_policy_is_flagged_and_lenient() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tweets.csv");
        let mut config = config(&path);
        config.filter.policy = FilterPolicy::MixedOrAnd;
        let source = three_posts();
        let scorer = LexiconScorer::new();
        let reporter = MemoryReporter::new();

        let summary = Pipeline::new(&config, &source, &scorer, &reporter)
            .run(None)
            .await
            .unwrap();

        // both 2021 posts pass on date alone; the 2022 one passes on keyword + blank location
        assert_eq!(summary.accepted, 3);
        assert!(reporter.contains(Level::Warn, "mixed-or-and"));
    }

    #[tokio::test]
    async fn test_limit_caps_fetched_posts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tweets.csv");
        let mut config = config(&path);
        config.timeline.limit = Some(1);
        let source = three_posts();
        let scorer = LexiconScorer::new();
        let reporter = MemoryReporter::new();

        let summary = Pipeline::new(&config, &source, &scorer, &reporter)
            .run(None)
            .await
            .unwrap();

        // newest post is from 2022 and gets rejected
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.written, 0);
        assert_eq!(read_rows(&path).len(), 0);
    }

    #[tokio::test]
    async fn test_counts_never_exceed_fetched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tweets.csv");
        let mut config = config(&path);
        config.filter.since = None;
        config.filter.until = None;
        config.filter.keywords = vec!["post".to_string()];
        config.timeline.page_size = 4;
        let source = MockTimeline::new(
            (1..=25)
                .map(|id| {
                    let text = if id % 3 == 0 { "post" } else { "other" };
                    post(id, (2021, 2, 1), text, "")
                })
                .collect(),
        );
        let scorer = LexiconScorer::new();
        let reporter = MemoryReporter::new();

        let summary = Pipeline::new(&config, &source, &scorer, &reporter)
            .run(None)
            .await
            .unwrap();

        assert_eq!(summary.fetched, 25);
        assert_eq!(summary.accepted, 8);
        assert!(summary.written <= summary.accepted);
        assert!(summary.accepted <= summary.fetched);
        assert_eq!(read_rows(&path).len(), summary.written);
    }

    struct FailingTimeline {
        served: Mutex<bool>,
    }

    #[async_trait]
    impl TimelineSource for FailingTimeline {
        async fn fetch_page(
            &self,
            _query: &TimelineQuery,
            _max_id: Option<u64>,
        ) -> FeedResult<TimelinePage> {
            let mut served = self.served.lock().unwrap();
            if *served {
                return Err(FeedError::RateLimited);
            }
            *served = true;
            Ok(TimelinePage::from_posts(vec![
                post(20, (2021, 5, 1), "space one", ""),
                post(19, (2021, 5, 1), "space two", ""),
            ]))
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_rows_already_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tweets.csv");
        let config = config(&path);
        let source = FailingTimeline {
            served: Mutex::new(false),
        };
        let scorer = LexiconScorer::new();
        let reporter = MemoryReporter::new();

        let err = Pipeline::new(&config, &source, &scorer, &reporter)
            .run(None)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<FeedError>(),
            Some(FeedError::RateLimited)
        ));
        assert_eq!(read_rows(&path).len(), 2);
    }

    #[tokio::test]
    async fn test_geocode_is_forwarded_to_query() {
        struct RecordingTimeline(Mutex<Vec<Option<GeocodeString>>>);

        #[async_trait]
        impl TimelineSource for RecordingTimeline {
            async fn fetch_page(
                &self,
                query: &TimelineQuery,
                _max_id: Option<u64>,
            ) -> FeedResult<TimelinePage> {
                self.0.lock().unwrap().push(query.geocode);
                Ok(TimelinePage::default())
            }
        }

        let dir = tempdir().unwrap();
        let config = config(&dir.path().join("tweets.csv"));
        let source = RecordingTimeline(Mutex::new(Vec::new()));
        let scorer = LexiconScorer::new();
        let reporter = MemoryReporter::new();
        let geocode = GeocodeString::new(31.0, -99.0, 1000).unwrap();

        Pipeline::new(&config, &source, &scorer, &reporter)
            .run(Some(geocode))
            .await
            .unwrap();

        assert_eq!(*source.0.lock().unwrap(), vec![Some(geocode)]);
    }

    #[test]
    fn test_score_cleans_before_scoring() {
        let config = Config::default();
        let source = MockTimeline::new(Vec::new());
        let scorer = LexiconScorer::new();
        let reporter = MemoryReporter::new();
        let pipeline = Pipeline::new(&config, &source, &scorer, &reporter);

        let scored = pipeline.score(post(1, (2021, 1, 1), "RT @x: terrible", ""));
        assert_eq!(scored.cleaned_text, "");
        assert_eq!(scored.polarity, 0.0);
        assert_eq!(scored.label, SentimentLabel::Neutral);
    }

    struct StaticResolver(Option<GeocodeString>);

    #[async_trait]
    impl PlaceResolver for StaticResolver {
        async fn resolve(&self, place: &str, _radius_km: u32) -> FeedResult<GeocodeString> {
            self.0
                .ok_or_else(|| FeedError::GeocodeNotFound(place.to_string()))
        }
    }

    #[tokio::test]
    async fn test_unresolved_place_is_fatal_when_required() {
        let mut config = Config::default();
        config.geocode.place = Some("Atlantis".to_string());
        let reporter = MemoryReporter::new();

        let err = resolve_geocode(&config, &StaticResolver(None), &reporter)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Atlantis"));
    }

    #[tokio::test]
    async fn test_unresolved_place_is_skipped_when_optional() {
        let mut config = Config::default();
        config.geocode.place = Some("Atlantis".to_string());
        config.geocode.required = false;
        let reporter = MemoryReporter::new();

        let geocode = resolve_geocode(&config, &StaticResolver(None), &reporter)
            .await
            .unwrap();
        assert!(geocode.is_none());
        assert!(reporter.contains(Level::Warn, "Atlantis"));
    }

    #[tokio::test]
    async fn test_resolved_place() {
        let mut config = Config::default();
        config.geocode.place = Some("Texas".to_string());
        let reporter = MemoryReporter::new();
        let expected = GeocodeString::new(31.26, -98.54, 1000).unwrap();

        let geocode = resolve_geocode(&config, &StaticResolver(Some(expected)), &reporter)
            .await
            .unwrap();
        assert_eq!(geocode, Some(expected));
    }

    #[tokio::test]
    async fn test_no_place_means_no_lookup() {
        let config = Config::default();
        let reporter = MemoryReporter::new();
        let geocode = resolve_geocode(&config, &StaticResolver(None), &reporter)
            .await
            .unwrap();
        assert!(geocode.is_none());
        assert!(reporter.messages().is_empty());
    }
}
