//! Resource records served by the Changes REST API.
//!
//! Each record deserializes from the JSON shape its REST endpoint (and
//! the matching push event) uses. Push payloads can be partial, so the
//! [`Merge`] implementations keep previously-known optional fields when
//! the newer copy omits them; required fields always take the newer
//! value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Condition, ResultKind, Status};
use crate::ids::{BuildId, JobId, LogSourceId, ProjectSlug, RevisionSha, TestGroupId};
use crate::item::{Keyed, Merge};

/// A resource that runs to completion with a status and a result.
///
/// Builds, jobs, and test groups all share this shape; the dashboard
/// derives their displayable [`Condition`] the same way for each.
pub trait Runnable {
    /// Current execution status.
    fn status(&self) -> Status;

    /// Outcome, meaningful once the status is [`Status::Finished`].
    fn result(&self) -> ResultKind;

    /// The derived displayable condition.
    fn condition(&self) -> Condition {
        Condition::of(self.status(), self.result())
    }
}

/// Merge an optional field, keeping the known value when the newer
/// copy omits it.
fn merge_opt<T>(base: &mut Option<T>, newer: Option<T>) {
    if newer.is_some() {
        *base = newer;
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// A build: one execution of a project's plan against a revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    /// Unique build identifier.
    pub id: BuildId,
    /// Monotonic per-project build number, when assigned.
    pub number: Option<u64>,
    /// Human-readable label (usually the commit subject).
    pub name: String,
    /// Execution status.
    #[serde(default)]
    pub status: Status,
    /// Outcome.
    #[serde(default)]
    pub result: ResultKind,
    /// Slug of the owning project.
    pub project: Option<ProjectSlug>,
    /// SHA of the revision being built.
    pub source_revision: Option<RevisionSha>,
    /// When the build was created.
    pub date_created: Option<DateTime<Utc>>,
    /// When execution started.
    pub date_started: Option<DateTime<Utc>>,
    /// When execution finished.
    pub date_finished: Option<DateTime<Utc>>,
}

impl Keyed for Build {
    type Key = BuildId;

    fn key(&self) -> BuildId {
        self.id
    }
}

impl Merge for Build {
    fn merge(&mut self, newer: Self) {
        self.id = newer.id;
        self.name = newer.name;
        self.status = newer.status;
        self.result = newer.result;
        merge_opt(&mut self.number, newer.number);
        merge_opt(&mut self.project, newer.project);
        merge_opt(&mut self.source_revision, newer.source_revision);
        merge_opt(&mut self.date_created, newer.date_created);
        merge_opt(&mut self.date_started, newer.date_started);
        merge_opt(&mut self.date_finished, newer.date_finished);
    }
}

impl Runnable for Build {
    fn status(&self) -> Status {
        self.status
    }

    fn result(&self) -> ResultKind {
        self.result
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A job: one execution phase within a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Identifier of the owning build.
    pub build_id: Option<BuildId>,
    /// Human-readable job name (e.g. `lint`, `unit-tests`).
    pub name: String,
    /// Execution status.
    #[serde(default)]
    pub status: Status,
    /// Outcome.
    #[serde(default)]
    pub result: ResultKind,
    /// When the job was created.
    pub date_created: Option<DateTime<Utc>>,
    /// When execution finished.
    pub date_finished: Option<DateTime<Utc>>,
}

impl Keyed for Job {
    type Key = JobId;

    fn key(&self) -> JobId {
        self.id
    }
}

impl Merge for Job {
    fn merge(&mut self, newer: Self) {
        self.id = newer.id;
        self.name = newer.name;
        self.status = newer.status;
        self.result = newer.result;
        merge_opt(&mut self.build_id, newer.build_id);
        merge_opt(&mut self.date_created, newer.date_created);
        merge_opt(&mut self.date_finished, newer.date_finished);
    }
}

impl Runnable for Job {
    fn status(&self) -> Status {
        self.status
    }

    fn result(&self) -> ResultKind {
        self.result
    }
}

// ---------------------------------------------------------------------------
// TestGroup
// ---------------------------------------------------------------------------

/// A test group: an aggregated set of test cases within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestGroup {
    /// Unique test group identifier.
    pub id: TestGroupId,
    /// Identifier of the owning job.
    pub job_id: Option<JobId>,
    /// Dotted test group name (e.g. `tests.storage.engine`).
    pub name: String,
    /// Execution status.
    #[serde(default)]
    pub status: Status,
    /// Outcome.
    #[serde(default)]
    pub result: ResultKind,
    /// Wall-clock duration in milliseconds, when measured.
    pub duration: Option<u64>,
    /// Number of test cases aggregated into this group.
    pub num_tests: Option<u64>,
}

impl Keyed for TestGroup {
    type Key = TestGroupId;

    fn key(&self) -> TestGroupId {
        self.id
    }
}

impl Merge for TestGroup {
    fn merge(&mut self, newer: Self) {
        self.id = newer.id;
        self.name = newer.name;
        self.status = newer.status;
        self.result = newer.result;
        merge_opt(&mut self.job_id, newer.job_id);
        merge_opt(&mut self.duration, newer.duration);
        merge_opt(&mut self.num_tests, newer.num_tests);
    }
}

impl Runnable for TestGroup {
    fn status(&self) -> Status {
        self.status
    }

    fn result(&self) -> ResultKind {
        self.result
    }
}

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// A commit in a project's repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// Full revision SHA.
    pub sha: RevisionSha,
    /// Commit message.
    pub message: String,
    /// Author display name.
    pub author_name: Option<String>,
    /// Author email address.
    pub author_email: Option<String>,
    /// When the revision was committed.
    pub date_committed: Option<DateTime<Utc>>,
}

impl Revision {
    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

impl Keyed for Revision {
    type Key = RevisionSha;

    fn key(&self) -> RevisionSha {
        self.sha.clone()
    }
}

impl Merge for Revision {
    fn merge(&mut self, newer: Self) {
        self.sha = newer.sha;
        self.message = newer.message;
        merge_opt(&mut self.author_name, newer.author_name);
        merge_opt(&mut self.author_email, newer.author_email);
        merge_opt(&mut self.date_committed, newer.date_committed);
    }
}

// ---------------------------------------------------------------------------
// LogChunk
// ---------------------------------------------------------------------------

/// One appended chunk of a job's log artifact.
///
/// Chunks are identified by (source, offset): the server never rewrites
/// a delivered offset, so re-delivery of the same chunk is a no-op
/// upsert rather than a duplicate line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogChunk {
    /// Identifier of the log source this chunk belongs to.
    pub source: LogSourceId,
    /// Byte offset of this chunk within the full log.
    pub offset: u64,
    /// Chunk text.
    pub text: String,
    /// Size of the chunk in bytes.
    pub size: Option<u64>,
}

impl Keyed for LogChunk {
    type Key = (LogSourceId, u64);

    fn key(&self) -> (LogSourceId, u64) {
        (self.source, self.offset)
    }
}

impl Merge for LogChunk {}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A project configured on the Changes server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// URL slug, the project's stable identity.
    pub slug: ProjectSlug,
    /// Display name.
    pub name: String,
}

impl Keyed for Project {
    type Key = ProjectSlug;

    fn key(&self) -> ProjectSlug {
        self.slug.clone()
    }
}

impl Merge for Project {}
