use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub name: String, // GitHub repository name
    pub owner: String, // user email
    pub github_username: String,
    pub created_at: String,
    pub is_active: bool,
}

impl Project {
    pub fn new(owner: &str, github_username: &str, github_repo: &str) -> Self {
        Project {
            project_id: uuid::Uuid::new_v4().to_string(),
            name: github_repo.to_string(),
            owner: owner.to_string(),
            github_username: github_username.to_string(),
            created_at: super::timestamp_now(),
            is_active: true,
        }
    }
}
