use crate::commands::db::MetricsStore;
use crate::error::{PipelineError, PipelineResult};
use crate::models::project::Project;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

/// Checks that a remote repository exists before any work is queued for it.
#[async_trait]
pub trait RepositoryValidator: Send + Sync {
    async fn repository_exists(&self, github_username: &str, github_repo: &str) -> PipelineResult<bool>;
}

pub struct GithubValidator {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GithubValidator {
    pub fn new(token: Option<String>) -> PipelineResult<Self> {
        Self::with_api_base("https://api.github.com", token)
    }

    pub fn with_api_base(api_base: &str, token: Option<String>) -> PipelineResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("maintainability/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Configuration(format!("GitHub client: {e}")))?;
        Ok(GithubValidator {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn repo_url(&self, github_username: &str, github_repo: &str) -> String {
        format!("{}/repos/{github_username}/{github_repo}", self.api_base)
    }
}

#[async_trait]
impl RepositoryValidator for GithubValidator {
    async fn repository_exists(&self, github_username: &str, github_repo: &str) -> PipelineResult<bool> {
        let mut request = self.client.get(self.repo_url(github_username, github_repo));
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request.send().await.map_err(|e| {
            PipelineError::Remote(format!("GitHub lookup for {github_username}/{github_repo} failed: {e}"))
        })?;
        Ok(response.status() == StatusCode::OK)
    }
}

/// Register a GitHub repository for `owner`.
///
/// Fails with `Validation` when the repository does not exist remotely or is
/// already registered (and active) for this owner.
pub async fn register_project(
    store: &dyn MetricsStore,
    validator: &dyn RepositoryValidator,
    owner: &str,
    github_username: &str,
    github_repo: &str,
) -> PipelineResult<Project> {
    if !validator.repository_exists(github_username, github_repo).await? {
        return Err(PipelineError::Validation(format!(
            "GitHub project {github_username}/{github_repo} not found"
        )));
    }

    if store.check_duplicate_project(owner, github_username, github_repo)? {
        return Err(PipelineError::Validation(format!(
            "Project {github_username}/{github_repo} already exists for {owner}"
        )));
    }

    let project = Project::new(owner, github_username, github_repo);
    store.insert_project(&project)?;
    log::info!("Registered project {github_username}/{github_repo} for {owner}");
    Ok(project)
}

/// Soft-delete a registered project.
pub fn remove_project(
    store: &dyn MetricsStore,
    owner: &str,
    github_username: &str,
    github_repo: &str,
) -> PipelineResult<()> {
    if !store.mark_project_inactive(owner, github_username, github_repo)? {
        return Err(PipelineError::NotFound(format!(
            "Project {github_username}/{github_repo} not found for {owner}"
        )));
    }
    log::info!("Marked project {github_username}/{github_repo} inactive for {owner}");
    Ok(())
}
