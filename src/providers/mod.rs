pub mod azure_server;

use async_trait::async_trait;

use crate::auth::Token;
use crate::error::Result;
use crate::integration::{IntegrationId, IntegrationKey};
use crate::models::{
    AccountOptions, CurrentUser, IssueOrPullRequest, MergeOptions, ProjectSummary, PullRequest,
    ResourceDescriptor, UnidentifiedAuthor,
};

/// Everything a server-specific lookup needs to address one repository.
#[derive(Debug, Clone, Copy)]
pub struct ServerRequest<'a> {
    pub key: &'a IntegrationKey,
    pub access_token: &'a Token,
    pub owner: &'a str,
    pub name: &'a str,
    pub base_url: &'a str,
}

/// Credentials and target for a generic provider API call.
#[derive(Debug, Clone, Copy)]
pub struct ApiRequest<'a> {
    pub id: IntegrationId,
    pub access_token: &'a Token,
    pub base_url: &'a str,
}

/// Client specialised for the self-managed server family.
#[async_trait]
pub trait ServerClient: Send + Sync {
    async fn get_account_for_commit(
        &self,
        request: &ServerRequest<'_>,
        rev: &str,
        options: AccountOptions,
    ) -> Result<Option<UnidentifiedAuthor>>;

    async fn get_issue_or_pull_request(
        &self,
        request: &ServerRequest<'_>,
        id: &str,
    ) -> Result<Option<IssueOrPullRequest>>;

    async fn get_pull_request_for_branch(
        &self,
        request: &ServerRequest<'_>,
        branch: &str,
    ) -> Result<Option<PullRequest>>;

    async fn get_pull_request_for_commit(
        &self,
        request: &ServerRequest<'_>,
        rev: &str,
    ) -> Result<Option<PullRequest>>;
}

/// Generic provider API client shared by all integrations of a host.
///
/// This is also the seam for response caching: a memoising wrapper keyed by
/// access token can implement this trait around another implementation.
#[async_trait]
pub trait ProvidersApi: Send + Sync {
    async fn get_current_user(&self, request: &ApiRequest<'_>) -> Result<Option<CurrentUser>>;

    async fn merge_pull_request(
        &self,
        request: &ApiRequest<'_>,
        pr: &PullRequest,
        options: MergeOptions,
    ) -> Result<bool>;

    async fn get_resources_for_user(
        &self,
        request: &ApiRequest<'_>,
        user_id: &str,
    ) -> Result<Option<Vec<ResourceDescriptor>>>;

    async fn get_projects_for_resource(
        &self,
        request: &ApiRequest<'_>,
        resource_name: &str,
    ) -> Result<Vec<ProjectSummary>>;
}
