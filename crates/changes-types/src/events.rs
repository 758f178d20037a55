//! Named push events delivered over the server's event feed.
//!
//! The feed carries the same JSON shapes as the REST resources, tagged
//! with an event name. Channel scoping (which resources a client sees)
//! is handled server-side by the feed's query string; the event name
//! alone decides which listeners a payload reaches.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known push event names.
pub mod event_names {
    /// A build was created or its status/result changed.
    pub const BUILD_UPDATE: &str = "build.update";
    /// A job was created or its status/result changed.
    pub const JOB_UPDATE: &str = "job.update";
    /// A test group finished or was re-aggregated.
    pub const TESTGROUP_UPDATE: &str = "testgroup.update";
    /// A chunk was appended to a job log.
    pub const BUILDLOG_UPDATE: &str = "buildlog.update";
}

/// One named event received from the push feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Event name (e.g. `build.update`).
    pub event: String,
    /// Raw payload, shaped like the corresponding REST resource.
    pub data: Value,
}

impl PushEvent {
    /// Decode the payload into a typed record.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error when the payload does not
    /// match the expected shape.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Conventional channel name for a single build's events.
pub fn build_channel(id: &crate::ids::BuildId) -> String {
    format!("builds:{id}")
}

/// Conventional channel name for a project's build events.
pub fn project_builds_channel(slug: &crate::ids::ProjectSlug) -> String {
    format!("projects:{slug}:builds")
}
