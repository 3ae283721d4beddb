use std::future::Future;
use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use log::{debug, info, warn};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use super::capability::{Backend, Capability, CapabilityOptions, CapabilityTable};
use super::key::{IntegrationId, IntegrationKey};
use super::outcome::{MergeOutcome, Outcome};
use crate::auth::{AuthProviderDescriptor, Session, DEFAULT_PROTOCOL};
use crate::error::{IntegrationError, Result};
use crate::models::{
    Account, AccountOptions, DefaultBranch, Issue, IssueOrPullRequest, MergeOptions,
    ProjectDescriptor, PullRequest, RepositoryDescriptor, RepositoryMetadata, ResourceDescriptor,
    UnidentifiedAuthor,
};
use crate::providers::{ApiRequest, ProvidersApi, ServerClient, ServerRequest};

/// Builds the generic API client on first use.
pub type ProvidersApiFactory =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn ProvidersApi>>> + Send + Sync>;

/// Wraps an async constructor into a [`ProvidersApiFactory`].
pub fn lazy_providers_api<F, Fut>(factory: F) -> ProvidersApiFactory
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<dyn ProvidersApi>>> + Send + 'static,
{
    Box::new(move || factory().boxed())
}

const SERVER_AUTH_PROVIDER: AuthProviderDescriptor = AuthProviderDescriptor {
    id: "azureDevOpsServer",
    scopes: &["vso.code", "vso.identity", "vso.project", "vso.work"],
};

const MERGE_ADVICE: &str =
    "Check branch policies, and ensure you have the necessary permissions to merge the pull request.";

/// Integration for one self-managed Azure DevOps Server, identified by its domain.
pub struct AzureDevOpsServerIntegration {
    key: IntegrationKey,
    domain: String,
    capabilities: CapabilityTable,
    providers_api: OnceCell<Arc<dyn ProvidersApi>>,
    providers_api_factory: ProvidersApiFactory,
    server_client: Option<Arc<dyn ServerClient>>,
}

impl AzureDevOpsServerIntegration {
    pub const ID: IntegrationId = IntegrationId::AzureDevOpsServer;
    pub const NAME: &'static str = "Azure DevOps Server";

    pub fn with_options(
        domain: impl Into<String>,
        providers_api_factory: ProvidersApiFactory,
        server_client: Option<Arc<dyn ServerClient>>,
        options: CapabilityOptions,
    ) -> Self {
        let domain = domain.into();
        let key = IntegrationKey::new(Self::ID, &domain);
        debug!("Created integration {key}");

        Self {
            key,
            domain,
            capabilities: CapabilityTable::for_server(options),
            providers_api: OnceCell::new(),
            providers_api_factory,
            server_client,
        }
    }

    pub fn id(&self) -> IntegrationId {
        Self::ID
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn auth_provider(&self) -> AuthProviderDescriptor {
        SERVER_AUTH_PROVIDER
    }

    pub fn key(&self) -> &IntegrationKey {
        &self.key
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub fn api_base_url(&self, session: Option<&Session>) -> String {
        let protocol = session.map_or(DEFAULT_PROTOCOL, Session::protocol_or_default);
        format!("{protocol}//{}", self.domain)
    }

    async fn providers_api(&self) -> Result<Arc<dyn ProvidersApi>> {
        self.providers_api
            .get_or_try_init(|| (self.providers_api_factory)())
            .await
            .map(Arc::clone)
    }

    fn server_request<'a>(
        &'a self,
        session: &'a Session,
        repo: &'a RepositoryDescriptor,
        base_url: &'a str,
    ) -> ServerRequest<'a> {
        ServerRequest {
            key: &self.key,
            access_token: &session.access_token,
            owner: &repo.owner,
            name: &repo.name,
            base_url,
        }
    }

    /// Returns the server client when `capability` is routed to it.
    ///
    /// `Err` carries the outcome to report instead of calling anything.
    fn route_to_server<T>(
        &self,
        capability: Capability,
    ) -> std::result::Result<&dyn ServerClient, Outcome<T>> {
        if !self.capabilities.is_supported(capability) {
            return Err(Outcome::Unsupported(capability));
        }
        match self.server_client.as_deref() {
            Some(client) => Ok(client),
            None => {
                debug!("No server client available for {capability} on {}", self.key);
                Err(Outcome::NotFound)
            }
        }
    }

    fn unsupported<T>(&self, capability: Capability) -> Outcome<T> {
        debug!("{capability} is not supported by {}", self.key);
        Outcome::Unsupported(capability)
    }

    /// Answers a capability that no collaborator has a lookup for yet.
    ///
    /// The table still decides: a routed capability reports `NotFound`, the
    /// same as a lookup whose collaborator is unavailable.
    fn unimplemented<T>(&self, capability: Capability) -> Outcome<T> {
        match self.capabilities.backend(capability) {
            Backend::Unsupported => self.unsupported(capability),
            backend => {
                warn!(
                    "{capability} is routed to {backend:?} on {} but has no lookup",
                    self.key
                );
                Outcome::NotFound
            }
        }
    }

    pub async fn get_current_account(&self, session: &Session) -> Result<Outcome<Account>> {
        let capability = Capability::CurrentAccount;
        if !self.capabilities.is_supported(capability) {
            return Ok(self.unsupported(capability));
        }

        let api = self.providers_api().await?;
        let base_url = self.api_base_url(Some(session));
        let request = ApiRequest {
            id: Self::ID,
            access_token: &session.access_token,
            base_url: &base_url,
        };

        let user = api.get_current_user(&request).await?;
        Ok(Outcome::from_option(user).map(|user| Account {
            provider: self.key.to_string(),
            id: user.id,
            name: user.name,
            email: user.email,
            username: user.username,
            avatar_url: user.avatar_url,
        }))
    }

    pub async fn get_resources_for_user(
        &self,
        session: &Session,
    ) -> Result<Outcome<Vec<ResourceDescriptor>>> {
        let capability = Capability::ResourcesForUser;
        if !self.capabilities.is_supported(capability) {
            return Ok(self.unsupported(capability));
        }

        let Some(account) = self.get_current_account(session).await?.found() else {
            return Ok(Outcome::NotFound);
        };

        let api = self.providers_api().await?;
        let base_url = self.api_base_url(Some(session));
        let request = ApiRequest {
            id: Self::ID,
            access_token: &session.access_token,
            base_url: &base_url,
        };

        let resources = api.get_resources_for_user(&request, &account.id).await?;
        Ok(Outcome::from_option(resources))
    }

    pub async fn get_projects_for_resources(
        &self,
        session: &Session,
        resources: &[ResourceDescriptor],
    ) -> Result<Outcome<Vec<ProjectDescriptor>>> {
        let capability = Capability::ProjectsForResources;
        if !self.capabilities.is_supported(capability) {
            return Ok(self.unsupported(capability));
        }

        let api = self.providers_api().await?;
        let base_url = self.api_base_url(Some(session));
        let request = ApiRequest {
            id: Self::ID,
            access_token: &session.access_token,
            base_url: &base_url,
        };

        info!("Fetching projects for {} resources...", resources.len());

        let per_resource = try_join_all(resources.iter().map(|resource| {
            let api = Arc::clone(&api);
            async move {
                let projects = api
                    .get_projects_for_resource(&request, &resource.name)
                    .await?;
                Ok::<_, IntegrationError>(
                    projects
                        .into_iter()
                        .map(|project| ProjectDescriptor {
                            id: project.id,
                            name: project.name,
                            description: project.description,
                            resource_name: resource.name.clone(),
                            resource_id: resource.id.clone(),
                        })
                        .collect::<Vec<_>>(),
                )
            }
        }))
        .await?;

        Ok(Outcome::Found(per_resource.into_iter().flatten().collect()))
    }

    /// Merges a pull request through the generic API client.
    ///
    /// Never fails: collaborator errors become [`MergeOutcome::NotMerged`]
    /// carrying a message meant for the user.
    pub async fn merge_pull_request(
        &self,
        session: &Session,
        pr: &PullRequest,
        options: MergeOptions,
    ) -> MergeOutcome {
        if !self.capabilities.is_supported(Capability::MergePullRequest) {
            debug!("Refusing to merge pull request {} on {}", pr.id, self.key);
            return MergeOutcome::Unsupported;
        }

        if pr.refs.is_none() || pr.project.is_none() {
            return MergeOutcome::NotMerged {
                reason: format!("Pull request {} is missing its refs or project", pr.id),
            };
        }

        let api = match self.providers_api().await {
            Ok(api) => api,
            Err(e) => return merge_failure(&pr.id, &e),
        };
        let base_url = self.api_base_url(Some(session));
        let request = ApiRequest {
            id: Self::ID,
            access_token: &session.access_token,
            base_url: &base_url,
        };

        match api.merge_pull_request(&request, pr, options).await {
            Ok(true) => {
                info!("Merged pull request {} on {}", pr.id, self.key);
                MergeOutcome::Merged
            }
            Ok(false) => MergeOutcome::NotMerged {
                reason: format!("Pull request {} was not completed. {MERGE_ADVICE}", pr.id),
            },
            Err(e) => merge_failure(&pr.id, &e),
        }
    }

    pub async fn get_account_for_commit(
        &self,
        session: &Session,
        repo: &RepositoryDescriptor,
        rev: &str,
        options: AccountOptions,
    ) -> Result<Outcome<UnidentifiedAuthor>> {
        let client = match self.route_to_server(Capability::AccountForCommit) {
            Ok(client) => client,
            Err(outcome) => return Ok(outcome),
        };
        let base_url = self.api_base_url(Some(session));
        let request = self.server_request(session, repo, &base_url);

        let author = client.get_account_for_commit(&request, rev, options).await?;
        Ok(Outcome::from_option(author))
    }

    pub async fn get_account_for_email(
        &self,
        _session: &Session,
        _repo: &RepositoryDescriptor,
        _email: &str,
        _options: AccountOptions,
    ) -> Result<Outcome<Account>> {
        Ok(self.unimplemented(Capability::AccountForEmail))
    }

    pub async fn get_default_branch(
        &self,
        _session: &Session,
        _repo: &RepositoryDescriptor,
    ) -> Result<Outcome<DefaultBranch>> {
        Ok(self.unimplemented(Capability::DefaultBranch))
    }

    pub async fn get_issue_or_pull_request(
        &self,
        session: &Session,
        repo: &RepositoryDescriptor,
        id: &str,
    ) -> Result<Outcome<IssueOrPullRequest>> {
        let client = match self.route_to_server(Capability::IssueOrPullRequest) {
            Ok(client) => client,
            Err(outcome) => return Ok(outcome),
        };
        let base_url = self.api_base_url(Some(session));
        let request = self.server_request(session, repo, &base_url);

        let item = client.get_issue_or_pull_request(&request, id).await?;
        Ok(Outcome::from_option(item))
    }

    pub async fn get_issue(
        &self,
        _session: &Session,
        _project: &ProjectDescriptor,
        _id: &str,
    ) -> Result<Outcome<Issue>> {
        // TODO: look up work items by project once project discovery is wired into the host.
        Ok(self.unimplemented(Capability::Issue))
    }

    pub async fn get_pull_request_for_branch(
        &self,
        session: &Session,
        repo: &RepositoryDescriptor,
        branch: &str,
        _options: AccountOptions,
    ) -> Result<Outcome<PullRequest>> {
        let client = match self.route_to_server(Capability::PullRequestForBranch) {
            Ok(client) => client,
            Err(outcome) => return Ok(outcome),
        };
        let base_url = self.api_base_url(Some(session));
        let request = self.server_request(session, repo, &base_url);

        let pr = client.get_pull_request_for_branch(&request, branch).await?;
        Ok(Outcome::from_option(pr))
    }

    pub async fn get_pull_request_for_commit(
        &self,
        session: &Session,
        repo: &RepositoryDescriptor,
        rev: &str,
    ) -> Result<Outcome<PullRequest>> {
        let client = match self.route_to_server(Capability::PullRequestForCommit) {
            Ok(client) => client,
            Err(outcome) => return Ok(outcome),
        };
        let base_url = self.api_base_url(Some(session));
        let request = self.server_request(session, repo, &base_url);

        let pr = client.get_pull_request_for_commit(&request, rev).await?;
        Ok(Outcome::from_option(pr))
    }

    /// The cancellation token is accepted for interface parity and ignored.
    pub async fn get_repository_metadata(
        &self,
        _session: &Session,
        _repo: &RepositoryDescriptor,
        _cancellation: Option<&CancellationToken>,
    ) -> Result<Outcome<RepositoryMetadata>> {
        Ok(self.unimplemented(Capability::RepositoryMetadata))
    }

    pub async fn search_my_pull_requests(
        &self,
        _session: &Session,
        _repos: Option<&[RepositoryDescriptor]>,
    ) -> Result<Outcome<Vec<PullRequest>>> {
        Ok(self.unimplemented(Capability::SearchMyPullRequests))
    }

    pub async fn search_my_issues(
        &self,
        _session: &Session,
        _repos: Option<&[RepositoryDescriptor]>,
    ) -> Result<Outcome<Vec<Issue>>> {
        Ok(self.unimplemented(Capability::SearchMyIssues))
    }
}

fn merge_failure(pr_id: &str, error: &IntegrationError) -> MergeOutcome {
    warn!("Failed to merge pull request {pr_id}: {error}");
    MergeOutcome::NotMerged {
        reason: format!("{error}. {MERGE_ADVICE}"),
    }
}
