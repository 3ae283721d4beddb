use log::{debug, info};

use super::AzureServerClient;
use crate::error::Result;
use crate::models::PullRequest;
use crate::providers::azure_server::dto::{
    ListResponse, PullRequestDto, PullRequestQueryDto, PullRequestQueryInputDto,
    PullRequestQueryResponseDto,
};
use crate::providers::azure_server::url_utils::{api_url, branch_ref, repository_api_path};
use crate::providers::ServerRequest;

impl AzureServerClient {
    fn to_pull_request(request: &ServerRequest<'_>, dto: PullRequestDto) -> PullRequest {
        dto.into_pull_request(
            request.key.as_str(),
            request.base_url,
            request.owner,
            request.name,
        )
    }

    pub(super) async fn fetch_pull_request(
        &self,
        request: &ServerRequest<'_>,
        id: &str,
    ) -> Result<Option<PullRequest>> {
        let path = format!(
            "{}/pullrequests/{}",
            repository_api_path(request.owner, request.name),
            urlencoding::encode(id)
        );
        let url = api_url(request.base_url, &path)?;

        let pr: Option<PullRequestDto> = self
            .rest
            .fetch_optional(self.rest.get(url, request.access_token), "Fetch pull request")
            .await?;

        Ok(pr.map(|dto| Self::to_pull_request(request, dto)))
    }

    pub(super) async fn fetch_active_pull_request_for_branch(
        &self,
        request: &ServerRequest<'_>,
        branch: &str,
    ) -> Result<Option<PullRequest>> {
        let path = format!(
            "{}/pullrequests",
            repository_api_path(request.owner, request.name)
        );
        let url = api_url(request.base_url, &path)?;
        let source_ref = branch_ref(branch);

        let http_request = self.rest.get(url, request.access_token).query(&[
            ("searchCriteria.sourceRefName", source_ref.as_str()),
            ("searchCriteria.status", "active"),
            ("$top", "1"),
        ]);

        let Some(prs) = self
            .rest
            .fetch_optional::<ListResponse<PullRequestDto>>(
                http_request,
                "List pull requests for branch",
            )
            .await?
        else {
            return Ok(None);
        };

        debug!("Found {} active pull requests for {source_ref}", prs.count);
        Ok(prs
            .value
            .into_iter()
            .next()
            .map(|dto| Self::to_pull_request(request, dto)))
    }

    pub(super) async fn query_pull_request_for_commit(
        &self,
        request: &ServerRequest<'_>,
        rev: &str,
    ) -> Result<Option<PullRequest>> {
        let path = format!(
            "{}/pullrequestquery",
            repository_api_path(request.owner, request.name)
        );
        let url = api_url(request.base_url, &path)?;
        let body = PullRequestQueryDto {
            queries: vec![PullRequestQueryInputDto {
                kind: "commit",
                items: vec![rev.to_string()],
            }],
        };

        info!(
            "Querying pull requests containing {rev} in {}/{}",
            request.owner, request.name
        );
        let Some(response) = self
            .rest
            .fetch_optional::<PullRequestQueryResponseDto>(
                self.rest.post(url, request.access_token).json(&body),
                "Query pull requests for commit",
            )
            .await?
        else {
            return Ok(None);
        };

        Ok(response
            .results
            .into_iter()
            .flat_map(|by_commit| by_commit.into_values())
            .flatten()
            .next()
            .map(|dto| Self::to_pull_request(request, dto)))
    }
}
