mod commits;
mod core;
mod pull_requests;
mod work_items;

#[cfg(test)]
mod test_support;

pub use self::core::RestCore;

use async_trait::async_trait;
use log::debug;

use crate::error::Result;
use crate::models::{AccountOptions, IssueOrPullRequest, PullRequest, UnidentifiedAuthor};
use crate::providers::{ServerClient, ServerRequest};

/// REST client for the Azure DevOps Server git and work item endpoints.
pub struct AzureServerClient {
    rest: RestCore,
}

impl AzureServerClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            rest: RestCore::new()?,
        })
    }
}

#[async_trait]
impl ServerClient for AzureServerClient {
    async fn get_account_for_commit(
        &self,
        request: &ServerRequest<'_>,
        rev: &str,
        _options: AccountOptions,
    ) -> Result<Option<UnidentifiedAuthor>> {
        let commit = self.fetch_commit(request, rev).await?;
        Ok(commit.and_then(|commit| commit.into_author(request.key.as_str())))
    }

    async fn get_issue_or_pull_request(
        &self,
        request: &ServerRequest<'_>,
        id: &str,
    ) -> Result<Option<IssueOrPullRequest>> {
        // Pull requests and work items share one numeric id space.
        if id.parse::<u64>().is_err() {
            debug!("Ignoring non-numeric issue or pull request id {id:?}");
            return Ok(None);
        }

        if let Some(pr) = self.fetch_pull_request(request, id).await? {
            return Ok(Some(IssueOrPullRequest::PullRequest(pr)));
        }

        let issue = self.fetch_work_item(request, id).await?;
        Ok(issue.map(IssueOrPullRequest::Issue))
    }

    async fn get_pull_request_for_branch(
        &self,
        request: &ServerRequest<'_>,
        branch: &str,
    ) -> Result<Option<PullRequest>> {
        self.fetch_active_pull_request_for_branch(request, branch)
            .await
    }

    async fn get_pull_request_for_commit(
        &self,
        request: &ServerRequest<'_>,
        rev: &str,
    ) -> Result<Option<PullRequest>> {
        self.query_pull_request_for_commit(request, rev).await
    }
}
