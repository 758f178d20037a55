//! The push-channel multiplexer.
//!
//! One [`StreamManager`] owns at most one feed connection at any time.
//! Views subscribe with a set of channel names and one event name; the
//! manager keeps a refcount per channel and reopens the connection with
//! an updated query string whenever the active channel set changes
//! (first subscriber on a channel, or last one gone). Channel scoping
//! is entirely server-side: an inbound event is delivered to every
//! subscriber of its event *name*, whatever channel produced it.
//!
//! A transport failure or clean end-of-stream while subscribers exist
//! re-enters an exponential-backoff reconnect loop (doubling delay up
//! to a ceiling, plus jitter, reset on success), so a dropped feed
//! heals itself instead of staying dropped until the next
//! subscribe/unsubscribe.
//!
//! Subscribers receive payloads through a broadcast channel; a
//! subscriber that falls behind skips ahead to the newest payload, in
//! the same way the dashboard tolerates missed intermediate updates.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use rand::Rng;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::sse::{SseEvent, SseParser};

/// Capacity of each per-event broadcast channel.
///
/// A subscriber that falls behind by more than this many payloads
/// receives a lag notification and resumes from the newest one.
const BROADCAST_CAPACITY: usize = 256;

/// Whether the manager currently holds an open feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No feed connection is open.
    #[default]
    Disconnected,
    /// A feed connection is open and delivering events.
    Connected,
}

/// Commands sent to the connection task.
enum Command {
    /// The active channel set changed; reconnect with this set.
    SetChannels(Vec<String>),
}

/// Shared subscriber bookkeeping.
#[derive(Default)]
struct Registry {
    /// Channel name -> number of live subscriptions naming it.
    channels: BTreeMap<String, usize>,
    /// Event name -> fan-out sender for its payloads.
    events: BTreeMap<String, broadcast::Sender<Value>>,
}

impl Registry {
    fn active_channels(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }
}

/// Handle for one view's subscription to feed events.
///
/// Dropping the subscription releases its channels; when it was the
/// last subscriber of a channel the connection is reopened without it.
pub struct Subscription {
    receiver: broadcast::Receiver<Value>,
    _guard: SubscriptionGuard,
}

impl Subscription {
    /// Receive the next payload for the subscribed event name.
    ///
    /// Lagged gaps are skipped silently (the dashboard only needs the
    /// newest state of a resource). Returns `None` once the event's
    /// fan-out channel is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        loop {
            match self.receiver.recv().await {
                Ok(value) => return Some(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped = skipped, "subscriber lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self._guard.event)
            .field("channels", &self._guard.channels)
            .finish()
    }
}

/// Removes the subscription's bookkeeping on drop.
struct SubscriptionGuard {
    registry: Arc<Mutex<Registry>>,
    commands: mpsc::UnboundedSender<Command>,
    channels: Vec<String>,
    event: String,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        let mut changed = false;

        for channel in &self.channels {
            let emptied = match registry.channels.get_mut(channel) {
                Some(count) => {
                    *count = count.saturating_sub(1);
                    *count == 0
                }
                None => false,
            };
            if emptied {
                registry.channels.remove(channel);
                changed = true;
            }
        }

        // The Subscription's receiver is dropped before this guard, so
        // a zero receiver count means the event has no listeners left.
        let prune_event = registry
            .events
            .get(&self.event)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if prune_event {
            registry.events.remove(&self.event);
        }

        if changed {
            let active = registry.active_channels();
            debug!(event = self.event, "subscription dropped, channel set shrank");
            let _ = self.commands.send(Command::SetChannels(active));
        }
    }
}

/// The injected connection manager shared by all views.
pub struct StreamManager {
    registry: Arc<Mutex<Registry>>,
    commands: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl StreamManager {
    /// Create a manager and spawn its connection task.
    ///
    /// No connection is opened until the first subscription arrives.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Config`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: StreamConfig) -> Result<Self, StreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| StreamError::Config(format!("failed to build HTTP client: {e}")))?;

        let registry = Arc::new(Mutex::new(Registry::default()));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

        let task_registry = Arc::clone(&registry);
        tokio::spawn(async move {
            connection_task(http, config, task_registry, commands_rx, status_tx).await;
        });

        Ok(Self {
            registry,
            commands: commands_tx,
            status_rx,
        })
    }

    /// Subscribe to an event name across a set of channels.
    ///
    /// Adding the first subscriber of a channel reopens the feed with
    /// the channel included; events published before the subscription
    /// are never delivered to it.
    pub fn subscribe<I, S>(&self, channels: I, event: &str) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: Vec<String> = channels.into_iter().map(Into::into).collect();
        let mut registry = lock(&self.registry);
        let mut changed = false;

        for channel in &channels {
            let count = registry.channels.entry(channel.clone()).or_insert(0);
            if *count == 0 {
                changed = true;
            }
            *count = count.saturating_add(1);
        }

        let receiver = registry
            .events
            .entry(event.to_owned())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .subscribe();

        if changed {
            let active = registry.active_channels();
            debug!(event = event, channels = ?channels, "channel set grew");
            let _ = self.commands.send(Command::SetChannels(active));
        }

        Subscription {
            receiver,
            _guard: SubscriptionGuard {
                registry: Arc::clone(&self.registry),
                commands: self.commands.clone(),
                channels,
                event: event.to_owned(),
            },
        }
    }

    /// The channels with at least one live subscription.
    pub fn active_channels(&self) -> Vec<String> {
        lock(&self.registry).active_channels()
    }

    /// Observe the connection status.
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }
}

impl std::fmt::Debug for StreamManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamManager")
            .field("active_channels", &self.active_channels())
            .field("status", &*self.status_rx.borrow())
            .finish()
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build the feed URL for a channel set, with a cache-busting
/// timestamp matching what the browser client sends.
fn feed_url(base: &str, channels: &[String]) -> String {
    let mut parts: Vec<String> = channels.iter().map(|c| format!("c={c}")).collect();
    parts.push(format!("_={}", chrono::Utc::now().timestamp_millis()));
    let query = parts.join("&");
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

/// Why one connection attempt ended.
enum Disposition {
    /// The channel set changed; reconnect immediately with the new set.
    ChannelsChanged(Vec<String>),
    /// The transport failed or the server closed the stream.
    Failed(StreamError),
    /// The manager was dropped; exit the task.
    Shutdown,
}

/// Owns the single feed connection for the manager's lifetime.
async fn connection_task(
    http: reqwest::Client,
    config: StreamConfig,
    registry: Arc<Mutex<Registry>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<ConnectionStatus>,
) {
    let mut channels: Vec<String> = Vec::new();
    let mut delay = config.backoff_initial;

    loop {
        if channels.is_empty() {
            status_tx.send_replace(ConnectionStatus::Disconnected);
            match commands.recv().await {
                Some(Command::SetChannels(next)) => {
                    channels = next;
                    delay = config.backoff_initial;
                    continue;
                }
                None => return,
            }
        }

        let disposition = run_connection(
            &http,
            &config,
            &registry,
            &mut commands,
            &status_tx,
            &channels,
        )
        .await;
        status_tx.send_replace(ConnectionStatus::Disconnected);

        match disposition {
            Disposition::ChannelsChanged(next) => {
                channels = next;
                delay = config.backoff_initial;
            }
            Disposition::Shutdown => return,
            Disposition::Failed(err) => {
                let jitter_ms = jitter_millis(config.backoff_jitter);
                let wait = delay.saturating_add(std::time::Duration::from_millis(jitter_ms));
                warn!(error = %err, wait_ms = wait.as_millis(), "feed dropped, reconnecting");
                tokio::select! {
                    () = tokio::time::sleep(wait) => {
                        delay = delay.saturating_mul(2).min(config.backoff_max);
                    }
                    command = commands.recv() => match command {
                        Some(Command::SetChannels(next)) => {
                            channels = next;
                            delay = config.backoff_initial;
                        }
                        None => return,
                    },
                }
            }
        }
    }
}

/// Open one feed connection and dispatch its events until it ends.
async fn run_connection(
    http: &reqwest::Client,
    config: &StreamConfig,
    registry: &Arc<Mutex<Registry>>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    status_tx: &watch::Sender<ConnectionStatus>,
    channels: &[String],
) -> Disposition {
    let url = feed_url(&config.feed_url, channels);
    debug!(url = url, "opening feed");

    let response = match http
        .get(&url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return Disposition::Failed(StreamError::Connect(format!("{e}"))),
    };

    let status = response.status();
    if !status.is_success() {
        return Disposition::Failed(StreamError::BadStatus(status.as_u16()));
    }

    info!(channels = channels.len(), "feed connected");
    status_tx.send_replace(ConnectionStatus::Connected);

    let mut body = response.bytes_stream();
    let mut parser = SseParser::new();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::SetChannels(next)) => {
                    if next == channels {
                        continue;
                    }
                    return Disposition::ChannelsChanged(next);
                }
                None => return Disposition::Shutdown,
            },
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for event in parser.push(&bytes) {
                        dispatch(registry, &event);
                    }
                }
                Some(Err(e)) => {
                    return Disposition::Failed(StreamError::Transport(format!("{e}")));
                }
                None => {
                    return Disposition::Failed(StreamError::Transport(
                        String::from("server closed the stream"),
                    ));
                }
            },
        }
    }
}

/// Deliver one parsed event to every listener of its event name.
fn dispatch(registry: &Arc<Mutex<Registry>>, event: &SseEvent) {
    let payload: Value = match serde_json::from_str(&event.data) {
        Ok(value) => value,
        Err(e) => {
            warn!(event = event.event, error = %e, "dropping undecodable payload");
            return;
        }
    };

    let registry = lock(registry);
    match registry.events.get(&event.event) {
        Some(sender) => {
            // send errs only with zero receivers, which just means the
            // last listener unsubscribed between frames.
            let delivered = sender.send(payload).unwrap_or(0);
            debug!(event = event.event, receivers = delivered, "dispatched");
        }
        None => debug!(event = event.event, "no listeners for event"),
    }
}

/// Random jitter in milliseconds, up to the configured bound.
fn jitter_millis(bound: std::time::Duration) -> u64 {
    let max = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
    if max == 0 {
        return 0;
    }
    rand::rng().random_range(0..=max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_url_lists_channels_and_cache_buster() {
        let url = feed_url(
            "http://h/api/0/stream/",
            &[String::from("builds:42"), String::from("jobs:7")],
        );
        assert!(url.starts_with("http://h/api/0/stream/?c=builds:42&c=jobs:7&_="));
    }

    #[test]
    fn feed_url_appends_to_existing_query() {
        let url = feed_url("http://h/stream?v=2", &[String::from("a")]);
        assert!(url.starts_with("http://h/stream?v=2&c=a&_="));
    }

    #[tokio::test]
    async fn subscribe_tracks_channel_refcounts() {
        let manager = StreamManager::new(StreamConfig::with_feed_url(
            // Nothing listens here; the task will back off harmlessly.
            "http://127.0.0.1:1/stream/",
        ))
        .unwrap_or_else(|e| {
            tracing::error!("manager build failed: {e}");
            std::process::exit(1)
        });

        let first = manager.subscribe([String::from("builds:42")], "build.update");
        let second = manager.subscribe([String::from("builds:42")], "build.update");
        assert_eq!(manager.active_channels(), vec![String::from("builds:42")]);

        drop(first);
        // Still one subscriber on the channel.
        assert_eq!(manager.active_channels(), vec![String::from("builds:42")]);

        drop(second);
        assert!(manager.active_channels().is_empty());
    }

    #[tokio::test]
    async fn distinct_channels_union_in_active_set() {
        let manager =
            StreamManager::new(StreamConfig::with_feed_url("http://127.0.0.1:1/stream/"))
                .unwrap_or_else(|e| {
                    tracing::error!("manager build failed: {e}");
                    std::process::exit(1)
                });

        let _builds = manager.subscribe([String::from("builds:42")], "build.update");
        let _jobs = manager.subscribe([String::from("jobs:7")], "job.update");
        assert_eq!(
            manager.active_channels(),
            vec![String::from("builds:42"), String::from("jobs:7")]
        );
    }
}
