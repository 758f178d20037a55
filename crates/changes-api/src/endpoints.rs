//! Typed helpers for the `/api/0/...` resource surface.
//!
//! | Method | Path | Helper |
//! |--------|------|--------|
//! | `GET` | `/projects/{slug}/builds/` | [`ApiClient::project_builds`] |
//! | `GET` | `/projects/{slug}/commits/` | [`ApiClient::project_commits`] |
//! | `GET` | `/builds/{id}/` | [`ApiClient::build`] |
//! | `GET` | `/builds/{id}/jobs/` | [`ApiClient::build_jobs`] |
//! | `GET` | `/jobs/{id}/tests/` | [`ApiClient::job_test_groups`] |
//! | `GET` | `/jobs/{id}/logs/{source}/` | [`ApiClient::job_log`] |
//! | `POST` | `/builds/{id}/restart/` | [`ApiClient::restart_build`] |
//!
//! List endpoints return an uninitialized [`PagedQuery`]; the view
//! decides the initial parameters. Single-resource fetches return a
//! [`FetchState`] directly.

use changes_types::{Build, BuildId, Job, JobId, LogChunk, LogSourceId, ProjectSlug, Revision, TestGroup};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::link::QueryParams;
use crate::paged::PagedQuery;
use crate::state::FetchState;

impl ApiClient {
    /// Paginated builds of a project, most recent first.
    pub fn project_builds(&self, slug: &ProjectSlug) -> PagedQuery<Build> {
        PagedQuery::new(self.clone(), format!("/projects/{slug}/builds/"))
    }

    /// Paginated commits of a project.
    pub fn project_commits(&self, slug: &ProjectSlug) -> PagedQuery<Revision> {
        PagedQuery::new(self.clone(), format!("/projects/{slug}/commits/"))
    }

    /// Paginated jobs of a build.
    pub fn build_jobs(&self, id: BuildId) -> PagedQuery<Job> {
        PagedQuery::new(self.clone(), format!("/builds/{id}/jobs/"))
    }

    /// Paginated test groups of a job.
    pub fn job_test_groups(&self, id: JobId) -> PagedQuery<TestGroup> {
        PagedQuery::new(self.clone(), format!("/jobs/{id}/tests/"))
    }

    /// Fetch a single build.
    pub async fn build(&self, id: BuildId) -> FetchState<Build> {
        self.get_state(&format!("/builds/{id}/"), &QueryParams::new())
            .await
    }

    /// Fetch chunks of a job's log source from a byte offset.
    pub async fn job_log(
        &self,
        job: JobId,
        source: LogSourceId,
        offset: Option<u64>,
    ) -> FetchState<Vec<LogChunk>> {
        let mut params = QueryParams::new();
        if let Some(offset) = offset {
            params.insert(String::from("offset"), offset.to_string());
        }
        self.get_state(&format!("/jobs/{job}/logs/{source}/"), &params)
            .await
    }

    /// Restart a finished build. Returns the restarted build record.
    ///
    /// # Errors
    ///
    /// Propagates the [`ApiError`] taxonomy; restart is an action, not
    /// a rendered data slot, so the caller decides how to surface
    /// failure.
    pub async fn restart_build(&self, id: BuildId) -> Result<Build, ApiError> {
        self.post_json(&format!("/builds/{id}/restart/"), &serde_json::json!({}))
            .await
    }
}
