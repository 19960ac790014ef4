//! Simple Analytics command-line tracker.
//!
//! Sends pageviews and events from scripts and manages the local opt-out flag.
//!
//! # Commands
//!
//! - `simpleanalytics pageview [SEGMENTS]...`: Record a pageview
//! - `simpleanalytics event <NAME> [SEGMENTS]...`: Record a named event
//! - `simpleanalytics opt-out` / `opt-in`: Disable or re-enable tracking
//! - `simpleanalytics status`: Show the persisted tracker state
//!
//! # Environment Variables
//!
//! See the [`config`](simpleanalytics::config) module for available configuration options.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use simpleanalytics::config::TrackerConfig;
use simpleanalytics::metadata::Metadata;
use simpleanalytics::storage::FileStorage;
use simpleanalytics::Tracker;

/// Simple Analytics command-line tracker.
///
/// Records pageviews and events for the hostname in SIMPLEANALYTICS_HOSTNAME.
#[derive(Parser, Debug)]
#[command(name = "simpleanalytics")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    SIMPLEANALYTICS_HOSTNAME      Site or app identifier (required)
    SIMPLEANALYTICS_SHARED_SCOPE  Shared storage scope for the last-visit date
    SIMPLEANALYTICS_ENDPOINT      Collection endpoint URL
    SIMPLEANALYTICS_STORAGE_DIR   Directory for persisted settings
    SIMPLEANALYTICS_TIMEOUT_SECS  HTTP request timeout (default: 30)

EXAMPLES:
    # Record a pageview of /settings/privacy
    simpleanalytics pageview Settings Privacy

    # Record a signup event with metadata
    simpleanalytics event signup onboarding --meta plan=premium --meta seats=5

    # Stop sending anything from this machine
    simpleanalytics opt-out
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Record a pageview.
    Pageview {
        /// Path segments, slugged and joined with `/`.
        segments: Vec<String>,

        /// Metadata entry as KEY=VALUE. May be repeated.
        #[arg(short, long = "meta", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,
    },

    /// Record a named event.
    Event {
        /// Event name.
        name: String,

        /// Path segments, slugged and joined with `/`.
        segments: Vec<String>,

        /// Metadata entry as KEY=VALUE. May be repeated.
        #[arg(short, long = "meta", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,
    },

    /// Disable tracking on this machine.
    OptOut,

    /// Re-enable tracking on this machine.
    OptIn,

    /// Show the persisted tracker state.
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    let config = TrackerConfig::from_env().context("Failed to load configuration")?;
    let tracker = Tracker::from_config(&config).context("Failed to create tracker")?;

    match cli.command {
        Command::Pageview { segments, meta } => {
            run_async(send(&tracker, None, segments, into_metadata(meta)))
        }
        Command::Event {
            name,
            segments,
            meta,
        } => run_async(send(
            &tracker,
            Some(name.as_str()),
            segments,
            into_metadata(meta),
        )),
        Command::OptOut => set_opt_out(&tracker, true),
        Command::OptIn => set_opt_out(&tracker, false),
        Command::Status => print_status(&tracker, &config),
    }
}

/// Runs a future on a fresh multi-threaded runtime.
fn run_async<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(future)
}

/// Sends one pageview or event and waits for the outcome.
async fn send(
    tracker: &Tracker,
    event: Option<&str>,
    segments: Vec<String>,
    metadata: Option<Metadata>,
) -> Result<()> {
    if tracker.is_opted_out() {
        eprintln!("Tracking is disabled (run 'simpleanalytics opt-in' to enable).");
        return Ok(());
    }

    tracker
        .track_raw(event, segments, metadata.as_ref())
        .await
        .context("Failed to send event")?;

    info!(event = event.unwrap_or("pageview"), "Done");
    Ok(())
}

fn set_opt_out(tracker: &Tracker, opted_out: bool) -> Result<()> {
    tracker
        .set_opted_out(opted_out)
        .context("Failed to update opt-out flag")?;

    if opted_out {
        println!("Tracking disabled.");
    } else {
        println!("Tracking enabled.");
    }
    Ok(())
}

fn print_status(tracker: &Tracker, config: &TrackerConfig) -> Result<()> {
    let storage_dir = match &config.storage_dir {
        Some(dir) => dir.clone(),
        None => FileStorage::default_dir().context("Failed to determine storage directory")?,
    };

    println!("Hostname:     {}", tracker.hostname());
    println!("Endpoint:     {}", config.endpoint);
    println!("Storage:      {}", storage_dir.display());
    println!(
        "Shared scope: {}",
        config.shared_scope.as_deref().unwrap_or("(none)")
    );
    println!("Opted out:    {}", tracker.is_opted_out());
    match tracker.last_visit() {
        Some(last_visit) => println!("Last visit:   {}", last_visit.to_rfc3339()),
        None => println!("Last visit:   (never)"),
    }
    Ok(())
}

/// Parses a `KEY=VALUE` metadata argument.
fn parse_key_value(arg: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{arg}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("metadata key cannot be empty in '{arg}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn into_metadata(entries: Vec<(String, String)>) -> Option<Metadata> {
    (!entries.is_empty()).then(|| entries.into_iter().collect())
}

/// Initializes the tracing subscriber for logging.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_key_value_splits_on_first_equals() {
        assert_eq!(
            parse_key_value("query=a=b"),
            Ok(("query".to_string(), "a=b".to_string()))
        );
    }

    #[test]
    fn parse_key_value_allows_empty_value() {
        assert_eq!(
            parse_key_value("flag="),
            Ok(("flag".to_string(), String::new()))
        );
    }

    #[test]
    fn parse_key_value_rejects_missing_separator() {
        assert!(parse_key_value("plan").is_err());
    }

    #[test]
    fn parse_key_value_rejects_empty_key() {
        assert!(parse_key_value(" =value").is_err());
    }

    #[test]
    fn into_metadata_is_none_when_empty() {
        assert!(into_metadata(Vec::new()).is_none());
    }

    #[test]
    fn into_metadata_collects_entries() {
        let metadata = into_metadata(vec![("plan".to_string(), "premium".to_string())]).unwrap();
        assert_eq!(metadata.get("plan"), Some("premium"));
    }

    #[test]
    fn cli_parses_event_with_metadata() {
        let cli = Cli::try_parse_from([
            "simpleanalytics",
            "event",
            "signup",
            "onboarding",
            "--meta",
            "plan=premium",
            "-m",
            "seats=5",
        ])
        .unwrap();

        match cli.command {
            Command::Event {
                name,
                segments,
                meta,
            } => {
                assert_eq!(name, "signup");
                assert_eq!(segments, vec!["onboarding".to_string()]);
                assert_eq!(meta.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_bare_pageview() {
        let cli = Cli::try_parse_from(["simpleanalytics", "pageview"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Pageview { ref segments, ref meta } if segments.is_empty() && meta.is_empty()
        ));
    }
}
