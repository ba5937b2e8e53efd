//! Pipeline run description consumed by the templates.
//!
//! A [`PipelineContext`] is built once per invocation from the CI
//! environment and is read-only afterwards. Field names serialize in
//! PascalCase so templates address them as `{{ Build.Event }}`,
//! `{{ Commit.SHA }}` and so on.

use serde::Serialize;

/// Stage status that marks a run as failed.
pub const STATUS_FAILURE: &str = "failure";

/// Repository the pipeline ran for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Repo {
    pub name: String,
    pub namespace: String,
    /// `namespace/name`.
    pub slug: String,
    pub link: String,
    /// Default branch.
    pub branch: String,
}

/// Commit author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Author {
    pub username: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Commit {
    #[serde(rename = "SHA")]
    pub sha: String,
    pub message: String,
    pub branch: String,
    #[serde(rename = "Ref")]
    pub git_ref: String,
    pub link: String,
    pub author: Author,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Build {
    /// Trigger event: push, pull_request, tag, promote, cron, custom.
    pub event: String,
    pub number: u64,
    /// Who or what triggered the build.
    pub trigger: String,
    pub link: String,
    pub status: String,
    pub parent: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stage {
    pub name: String,
    pub number: u64,
    pub status: String,
}

/// Names of the steps and stages that failed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Failed {
    pub steps: Vec<String>,
    pub stages: Vec<String>,
}

impl Failed {
    /// Build from the comma-separated lists the CI runner exports.
    pub fn from_lists(steps: &str, stages: &str) -> Self {
        Self {
            steps: split_list(steps),
            stages: split_list(stages),
        }
    }
}

/// Split a comma-separated list, dropping blank entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Immutable view of one CI run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineContext {
    pub repo: Repo,
    pub commit: Commit,
    pub build: Build,
    pub stage: Stage,
    pub failed: Failed,
}

impl PipelineContext {
    /// A run succeeded when its stage did not fail and nothing is listed as failed.
    pub fn is_success(&self) -> bool {
        self.stage.status != STATUS_FAILURE
            && self.failed.steps.is_empty()
            && self.failed.stages.is_empty()
    }

    /// `SUCCESS` or `FAILURE`.
    pub fn status_label(&self) -> &'static str {
        if self.is_success() { "SUCCESS" } else { "FAILURE" }
    }

    /// Data handed to the template engines.
    pub fn template_data(&self) -> TemplateData<'_> {
        TemplateData {
            commit: &self.commit,
            author: &self.commit.author,
            repo: &self.repo,
            stage: &self.stage,
            build: &self.build,
            failed: &self.failed,
            is_success: self.is_success(),
            status: self.status_label(),
        }
    }
}

/// Key-value context exposed to templates.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateData<'a> {
    pub commit: &'a Commit,
    pub author: &'a Author,
    pub repo: &'a Repo,
    pub stage: &'a Stage,
    pub build: &'a Build,
    pub failed: &'a Failed,
    pub is_success: bool,
    pub status: &'static str,
}
