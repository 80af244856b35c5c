use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use feedsent::config::{Config, Overrides};
use feedsent::export::Locale;
use feedsent::filter::FilterPolicy;
use feedsent::geocode::Geocoder;
use feedsent::pipeline::{resolve_geocode, Pipeline};
use feedsent::report::{Reporter, TracingReporter};
use feedsent::TwitterClient;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "feedsent")]
#[command(about = "Export a user's timeline with sentiment labels to CSV", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to <config dir>/feedsent/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Account whose timeline is fetched
    #[arg(short, long)]
    user: Option<String>,

    /// Stop after fetching this many posts
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Destination CSV file (overwritten)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First day to keep (YYYY-MM-DD, inclusive)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Last day to keep (YYYY-MM-DD, inclusive)
    #[arg(long)]
    until: Option<NaiveDate>,

    /// Keyword to look for; repeat for several
    #[arg(short = 'k', long = "keyword")]
    keywords: Vec<String>,

    /// Substring of the author's profile location
    #[arg(long)]
    location: Option<String>,

    /// Place to geocode into a server-side search area
    #[arg(long)]
    place: Option<String>,

    /// strict-and, mixed-or-and or all-of
    #[arg(long)]
    policy: Option<FilterPolicy>,

    /// Header and label language: es or en
    #[arg(long)]
    locale: Option<Locale>,

    /// Append a permalink column
    #[arg(long)]
    include_url: bool,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            user: self.user.clone(),
            limit: self.limit,
            output: self.output.clone(),
            since: self.since,
            until: self.until,
            keywords: self.keywords.clone(),
            location: self.location.clone(),
            policy: self.policy,
            place: self.place.clone(),
            locale: self.locale,
            include_url: self.include_url,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.apply_env();
    config.apply_overrides(cli.overrides());
    config.validate()?;

    let reporter = TracingReporter;

    let geocoder = Geocoder::new(config.geocode.endpoint.as_str(), config.timeout());
    let geocode = resolve_geocode(&config, &geocoder, &reporter).await?;

    let client = TwitterClient::with_options(
        config.credentials.clone(),
        config.timeline.api_base.as_str(),
        config.timeout(),
    );
    reporter.info("Connection created");

    let scorer = config.scorer();
    let summary = Pipeline::new(&config, &client, &scorer, &reporter)
        .run(geocode)
        .await?;

    reporter.info(&format!(
        "Done: {} rows written to {}",
        summary.written,
        summary.output.display()
    ));
    Ok(())
}
