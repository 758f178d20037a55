//! Terminal tail of a project's builds.
//!
//! Fetches the first page of a project's builds over REST, seeds a
//! capped newest-first collection, then subscribes to the project's
//! build channel and logs every live update with its derived
//! condition until interrupted.
//!
//! # Configuration
//!
//! Environment variables (see the `changes-api` and `changes-stream`
//! config modules for the full tables):
//! - `CHANGES_API_URL` -- REST base URL
//! - `CHANGES_STREAM_URL` -- event feed URL
//! - `CHANGES_PROJECT` -- project slug to follow (default `example`)

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use changes_api::{ApiClient, ApiConfig, QueryParams};
use changes_stream::{StreamConfig, StreamManager};
use changes_sync::{Collection, CollectionOptions, InsertPosition, LiveCollection};
use changes_types::{Build, ProjectSlug, Runnable, event_names, project_builds_channel};

/// How many builds to keep in the tail window.
const TAIL_LIMIT: usize = 25;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment
/// variables, seeds the build collection from the REST API, then
/// follows the project's build channel until `Ctrl-C`.
///
/// # Errors
///
/// Returns an error if configuration or client construction fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("changes-tail starting");

    let api_config = ApiConfig::from_env()?;
    let stream_config = StreamConfig::from_env()?;
    let project = ProjectSlug::from(
        std::env::var("CHANGES_PROJECT").unwrap_or_else(|_| String::from("example")),
    );
    info!(
        api_url = api_config.base_url,
        feed_url = stream_config.feed_url,
        project = %project,
        "configuration loaded"
    );

    let client = ApiClient::new(&api_config)?;
    let manager = StreamManager::new(stream_config)?;

    // Seed the collection from the first REST page.
    let builds = client.project_builds(&project);
    builds.initialize(QueryParams::new()).await;
    let seeded: Vec<Build> = builds
        .data_to_show()
        .map(|view| view.items)
        .unwrap_or_default();
    if seeded.is_empty() {
        if let Some(error) = builds.last_error() {
            warn!(message = error.message, "initial page failed, starting empty");
        }
    }
    info!(count = seeded.len(), "seeded from REST");

    let collection = Collection::with_items(
        seeded,
        CollectionOptions::new().with_limit(TAIL_LIMIT),
    );
    let mut revisions = collection.revision_watch();

    let subscription =
        manager.subscribe([project_builds_channel(&project)], event_names::BUILD_UPDATE);
    let live = LiveCollection::spawn(collection, subscription, InsertPosition::Front);

    info!("following live updates (Ctrl-C to stop)");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                break;
            }
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                live.read(|collection| {
                    if let Some(build) = collection.first() {
                        info!(
                            build = build.name,
                            status = ?build.status,
                            condition = ?build.condition(),
                            "updated"
                        );
                    }
                });
            }
        }
    }

    Ok(())
}
