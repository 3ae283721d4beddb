use async_trait::async_trait;
use log::{debug, info};

use super::client::RestCore;
use super::dto::{
    merge_strategy, CommitRefDto, CompletePullRequestDto, CompletionOptionsDto,
    ConnectionDataDto, ListResponse, ProjectCollectionDto, ProjectDto, PullRequestDto,
};
use super::url_utils::{api_url, encode_path, repository_api_path};
use crate::error::{IntegrationError, Result};
use crate::models::{CurrentUser, MergeOptions, ProjectSummary, PullRequest, ResourceDescriptor};
use crate::providers::{ApiRequest, ProvidersApi};

/// `ProvidersApi` over the REST endpoints of the same server.
pub struct AzureProvidersApi {
    rest: RestCore,
}

impl AzureProvidersApi {
    pub fn new() -> Result<Self> {
        Ok(Self {
            rest: RestCore::new()?,
        })
    }
}

#[async_trait]
impl ProvidersApi for AzureProvidersApi {
    async fn get_current_user(&self, request: &ApiRequest<'_>) -> Result<Option<CurrentUser>> {
        let url = api_url(request.base_url, "_apis/connectionData")?;
        debug!("Fetching current {} user", request.id);

        let data: Option<ConnectionDataDto> = self
            .rest
            .fetch_optional(
                self.rest.get(url, request.access_token),
                "Fetch connection data",
            )
            .await?;

        Ok(data
            .and_then(|data| data.authenticated_user)
            .map(CurrentUser::from))
    }

    async fn merge_pull_request(
        &self,
        request: &ApiRequest<'_>,
        pr: &PullRequest,
        options: MergeOptions,
    ) -> Result<bool> {
        let (Some(refs), Some(project)) = (&pr.refs, &pr.project) else {
            return Err(IntegrationError::Api(format!(
                "Pull request {} has no refs or project",
                pr.id
            )));
        };
        let Some(head_sha) = refs.head.sha.clone() else {
            return Err(IntegrationError::Api(format!(
                "Pull request {} has no source commit",
                pr.id
            )));
        };

        let path = format!(
            "{}/pullrequests/{}",
            repository_api_path(&project.owner, &project.repo),
            urlencoding::encode(&pr.id)
        );
        let url = api_url(request.base_url, &path)?;
        let body = CompletePullRequestDto {
            status: "completed",
            last_merge_source_commit: CommitRefDto {
                commit_id: head_sha,
            },
            completion_options: CompletionOptionsDto {
                merge_strategy: merge_strategy(options.merge_method),
                delete_source_branch: false,
            },
        };

        info!(
            "Completing pull request {} in {}/{}",
            pr.id, project.owner, project.repo
        );
        let updated: Option<PullRequestDto> = self
            .rest
            .fetch_optional(
                self.rest.patch(url, request.access_token).json(&body),
                "Complete pull request",
            )
            .await?;

        match updated {
            Some(updated) if updated.is_completion_queued() => {
                info!("Completion of pull request {} is queued", pr.id);
                Ok(true)
            }
            Some(updated) => Ok(updated.is_completed()),
            None => Err(IntegrationError::Api(format!(
                "Pull request {} not found",
                pr.id
            ))),
        }
    }

    async fn get_resources_for_user(
        &self,
        request: &ApiRequest<'_>,
        user_id: &str,
    ) -> Result<Option<Vec<ResourceDescriptor>>> {
        let url = api_url(request.base_url, "_apis/projectCollections")?;

        debug!("Listing project collections for user {user_id}");
        let collections: Option<ListResponse<ProjectCollectionDto>> = self
            .rest
            .fetch_optional(
                self.rest.get(url, request.access_token),
                "List project collections",
            )
            .await?;

        Ok(collections.map(|list| {
            list.value
                .into_iter()
                .map(ResourceDescriptor::from)
                .collect()
        }))
    }

    async fn get_projects_for_resource(
        &self,
        request: &ApiRequest<'_>,
        resource_name: &str,
    ) -> Result<Vec<ProjectSummary>> {
        let path = format!("{}/_apis/projects", encode_path(resource_name));
        let url = api_url(request.base_url, &path)?;

        let projects: Option<ListResponse<ProjectDto>> = self
            .rest
            .fetch_optional(self.rest.get(url, request.access_token), "List projects")
            .await?;

        let projects: Vec<ProjectSummary> = projects
            .map(|list| list.value.into_iter().map(ProjectSummary::from).collect())
            .unwrap_or_default();
        debug!("Found {} projects in {resource_name}", projects.len());
        Ok(projects)
    }
}
