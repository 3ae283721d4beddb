use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::url_utils::{branch_name, pull_request_web_url, work_item_web_url};
use crate::models::{
    CurrentUser, Issue, IssueState, MergeMethod, ProjectSummary, PullRequest, PullRequestAuthor,
    PullRequestProject, PullRequestRef, PullRequestRefs, PullRequestState, ResourceDescriptor,
    UnidentifiedAuthor,
};

/// Work item states that count as closed.
const CLOSED_WORK_ITEM_STATES: [&str; 4] = ["Closed", "Done", "Removed", "Resolved"];

/// Envelope the REST API wraps every collection in.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub count: usize,
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct GitUserDateDto {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitDto {
    pub commit_id: String,
    pub author: Option<GitUserDateDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRefDto {
    pub display_name: Option<String>,
    pub unique_name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRefDto {
    pub commit_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TeamProjectReferenceDto {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GitRepositoryRefDto {
    pub id: Option<String>,
    pub name: String,
    pub project: Option<TeamProjectReferenceDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestDto {
    pub pull_request_id: u64,
    pub status: String,
    pub title: String,
    #[serde(default)]
    pub is_draft: bool,
    pub creation_date: Option<String>,
    pub closed_date: Option<String>,
    pub created_by: Option<IdentityRefDto>,
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub last_merge_source_commit: Option<CommitRefDto>,
    pub last_merge_target_commit: Option<CommitRefDto>,
    pub repository: Option<GitRepositoryRefDto>,
    pub merge_status: Option<String>,
    pub completion_queue_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkDto {
    pub href: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkItemLinksDto {
    pub html: Option<LinkDto>,
}

#[derive(Debug, Deserialize)]
pub struct WorkItemFieldsDto {
    #[serde(rename = "System.Title")]
    pub title: String,
    #[serde(rename = "System.State")]
    pub state: Option<String>,
    #[serde(rename = "System.WorkItemType")]
    pub work_item_type: Option<String>,
    #[serde(rename = "System.CreatedDate")]
    pub created_date: Option<String>,
    #[serde(rename = "Microsoft.VSTS.Common.ClosedDate")]
    pub closed_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkItemDto {
    pub id: u64,
    pub fields: WorkItemFieldsDto,
    #[serde(rename = "_links", default)]
    pub links: WorkItemLinksDto,
}

#[derive(Debug, Serialize)]
pub struct PullRequestQueryInputDto {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub items: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PullRequestQueryDto {
    pub queries: Vec<PullRequestQueryInputDto>,
}

/// Each result maps a queried commit id to the pull requests that contain it.
#[derive(Debug, Deserialize)]
pub struct PullRequestQueryResponseDto {
    #[serde(default)]
    pub results: Vec<HashMap<String, Vec<PullRequestDto>>>,
}

#[derive(Debug, Deserialize)]
pub struct PropertyValueDto {
    #[serde(rename = "$value")]
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPropertiesDto {
    #[serde(rename = "Account")]
    pub account: Option<PropertyValueDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUserDto {
    pub id: String,
    pub provider_display_name: Option<String>,
    pub custom_display_name: Option<String>,
    #[serde(default)]
    pub properties: UserPropertiesDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDataDto {
    pub authenticated_user: Option<AuthenticatedUserDto>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectCollectionDto {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptionsDto {
    pub merge_strategy: &'static str,
    pub delete_source_branch: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePullRequestDto {
    pub status: &'static str,
    pub last_merge_source_commit: CommitRefDto,
    pub completion_options: CompletionOptionsDto,
}

pub fn merge_strategy(method: Option<MergeMethod>) -> &'static str {
    match method {
        Some(MergeMethod::Squash) => "squash",
        Some(MergeMethod::Rebase) => "rebase",
        Some(MergeMethod::Merge) | None => "noFastForward",
    }
}

fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    // Unset dates come back as "0001-01-01T00:00:00" without an offset and fail to parse.
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|date| date.with_timezone(&Utc))
}

impl CommitDto {
    pub fn into_author(self, provider: &str) -> Option<UnidentifiedAuthor> {
        let author = self.author?;
        Some(UnidentifiedAuthor {
            provider: provider.to_string(),
            name: author.name,
            email: author.email,
            avatar_url: None,
        })
    }
}

impl PullRequestDto {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// The server accepted the completion but merges asynchronously.
    pub fn is_completion_queued(&self) -> bool {
        self.status == "active"
            && self.completion_queue_time.is_some()
            && !matches!(
                self.merge_status.as_deref(),
                Some("conflicts" | "failure" | "rejectedByPolicy")
            )
    }

    pub fn into_pull_request(
        self,
        provider: &str,
        base_url: &str,
        owner: &str,
        repo_name: &str,
    ) -> PullRequest {
        let state = match self.status.as_str() {
            "completed" => PullRequestState::Merged,
            "abandoned" => PullRequestState::Closed,
            _ => PullRequestState::Opened,
        };

        let (repository_name, repository_id, project_id) = match self.repository {
            Some(repository) => (
                repository.name,
                repository.id,
                repository.project.and_then(|project| project.id),
            ),
            None => (repo_name.to_string(), None, None),
        };

        let author = self.created_by.and_then(|identity| {
            identity.display_name.map(|name| PullRequestAuthor {
                name,
                email: identity.unique_name,
                avatar_url: identity.image_url,
            })
        });

        PullRequest {
            provider: provider.to_string(),
            id: self.pull_request_id.to_string(),
            title: self.title,
            url: Some(pull_request_web_url(
                base_url,
                owner,
                &repository_name,
                self.pull_request_id,
            )),
            state,
            is_draft: self.is_draft,
            author,
            created_date: parse_date(self.creation_date.as_deref()),
            closed_date: parse_date(self.closed_date.as_deref()),
            refs: Some(PullRequestRefs {
                base: PullRequestRef {
                    branch: branch_name(&self.target_ref_name).to_string(),
                    sha: self.last_merge_target_commit.map(|commit| commit.commit_id),
                },
                head: PullRequestRef {
                    branch: branch_name(&self.source_ref_name).to_string(),
                    sha: self.last_merge_source_commit.map(|commit| commit.commit_id),
                },
            }),
            project: Some(PullRequestProject {
                owner: owner.to_string(),
                repo: repository_name,
                project_id,
                repository_id,
            }),
        }
    }
}

impl WorkItemDto {
    pub fn into_issue(self, provider: &str, base_url: &str, owner: &str) -> Issue {
        let state = match self.fields.state.as_deref() {
            Some(state) if CLOSED_WORK_ITEM_STATES.contains(&state) => IssueState::Closed,
            _ => IssueState::Opened,
        };
        let url = self
            .links
            .html
            .map(|link| link.href)
            .unwrap_or_else(|| work_item_web_url(base_url, owner, self.id));

        Issue {
            provider: provider.to_string(),
            id: self.id.to_string(),
            title: self.fields.title,
            url: Some(url),
            state,
            work_item_type: self.fields.work_item_type,
            created_date: parse_date(self.fields.created_date.as_deref()),
            closed_date: parse_date(self.fields.closed_date.as_deref()),
        }
    }
}

impl From<AuthenticatedUserDto> for CurrentUser {
    fn from(user: AuthenticatedUserDto) -> Self {
        Self {
            id: user.id,
            name: user.custom_display_name.or(user.provider_display_name),
            email: user.properties.account.and_then(|account| account.value),
            username: None,
            avatar_url: None,
        }
    }
}

impl From<ProjectCollectionDto> for ResourceDescriptor {
    fn from(collection: ProjectCollectionDto) -> Self {
        Self {
            id: collection.id,
            name: collection.name,
            url: collection.url,
        }
    }
}

impl From<ProjectDto> for ProjectSummary {
    fn from(project: ProjectDto) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
        }
    }
}
