//! Recording fakes for the collaborator traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::adapter::{lazy_providers_api, ProvidersApiFactory};
use crate::error::{IntegrationError, Result};
use crate::models::{
    AccountOptions, CurrentUser, IssueOrPullRequest, MergeMethod, MergeOptions, ProjectSummary,
    PullRequest, PullRequestProject, PullRequestRef, PullRequestRefs, PullRequestState,
    ResourceDescriptor, UnidentifiedAuthor,
};
use crate::providers::{ApiRequest, ProvidersApi, ServerClient, ServerRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCall {
    pub method: &'static str,
    pub key: String,
    pub access_token: String,
    pub owner: String,
    pub name: String,
    pub argument: String,
    pub base_url: String,
    pub avatar_size: Option<u32>,
}

#[derive(Default)]
pub struct RecordingServerClient {
    calls: Mutex<Vec<ServerCall>>,
    pull_request: Option<PullRequest>,
    fail: bool,
}

impl RecordingServerClient {
    pub fn with_pull_request(pr: PullRequest) -> Self {
        Self {
            pull_request: Some(pr),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn author() -> UnidentifiedAuthor {
        UnidentifiedAuthor {
            provider: "azureDevOpsServer:ado.example.org".to_string(),
            name: Some("Jamie Doe".to_string()),
            email: Some("jamie@example.org".to_string()),
            avatar_url: None,
        }
    }

    pub fn calls(&self) -> Vec<ServerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(
        &self,
        method: &'static str,
        request: &ServerRequest<'_>,
        argument: &str,
        avatar_size: Option<u32>,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(ServerCall {
            method,
            key: request.key.to_string(),
            access_token: request.access_token.as_str().to_string(),
            owner: request.owner.to_string(),
            name: request.name.to_string(),
            argument: argument.to_string(),
            base_url: request.base_url.to_string(),
            avatar_size,
        });
        if self.fail {
            return Err(IntegrationError::Api(format!("{method} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl ServerClient for RecordingServerClient {
    async fn get_account_for_commit(
        &self,
        request: &ServerRequest<'_>,
        rev: &str,
        options: AccountOptions,
    ) -> Result<Option<UnidentifiedAuthor>> {
        self.record("get_account_for_commit", request, rev, options.avatar_size)?;
        Ok(Some(Self::author()))
    }

    async fn get_issue_or_pull_request(
        &self,
        request: &ServerRequest<'_>,
        id: &str,
    ) -> Result<Option<IssueOrPullRequest>> {
        self.record("get_issue_or_pull_request", request, id, None)?;
        Ok(self.pull_request.clone().map(IssueOrPullRequest::PullRequest))
    }

    async fn get_pull_request_for_branch(
        &self,
        request: &ServerRequest<'_>,
        branch: &str,
    ) -> Result<Option<PullRequest>> {
        self.record("get_pull_request_for_branch", request, branch, None)?;
        Ok(self.pull_request.clone())
    }

    async fn get_pull_request_for_commit(
        &self,
        request: &ServerRequest<'_>,
        rev: &str,
    ) -> Result<Option<PullRequest>> {
        self.record("get_pull_request_for_commit", request, rev, None)?;
        Ok(self.pull_request.clone())
    }
}

#[derive(Default)]
pub struct FakeProvidersApi {
    factory_calls: AtomicUsize,
    merge_calls: AtomicUsize,
    last_merge_method: Mutex<Option<MergeMethod>>,
    resource_user_ids: Mutex<Vec<String>>,
    user_id: Option<String>,
    merge_result: bool,
    merge_error: Option<String>,
    projects: Vec<ProjectSummary>,
}

impl FakeProvidersApi {
    pub fn with_user(mut self, id: &str) -> Self {
        self.user_id = Some(id.to_string());
        self
    }

    pub fn merging(mut self, result: bool) -> Self {
        self.merge_result = result;
        self
    }

    pub fn merge_error(mut self, message: &str) -> Self {
        self.merge_error = Some(message.to_string());
        self
    }

    pub fn with_projects(mut self, projects: Vec<ProjectSummary>) -> Self {
        self.projects = projects;
        self
    }

    pub fn record_factory_call(&self) {
        self.factory_calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn factory_calls(&self) -> usize {
        self.factory_calls.load(Ordering::SeqCst)
    }

    pub fn merge_calls(&self) -> usize {
        self.merge_calls.load(Ordering::SeqCst)
    }

    pub fn last_merge_method(&self) -> Option<MergeMethod> {
        *self.last_merge_method.lock().unwrap()
    }

    pub fn resource_user_ids(&self) -> Vec<String> {
        self.resource_user_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProvidersApi for FakeProvidersApi {
    async fn get_current_user(&self, _request: &ApiRequest<'_>) -> Result<Option<CurrentUser>> {
        Ok(self.user_id.clone().map(|id| CurrentUser {
            id,
            name: Some("Test User".to_string()),
            email: Some("test@example.org".to_string()),
            username: Some("CORP\\test".to_string()),
            avatar_url: None,
        }))
    }

    async fn merge_pull_request(
        &self,
        _request: &ApiRequest<'_>,
        _pr: &PullRequest,
        options: MergeOptions,
    ) -> Result<bool> {
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_merge_method.lock().unwrap() = options.merge_method;
        match &self.merge_error {
            Some(message) => Err(IntegrationError::Api(message.clone())),
            None => Ok(self.merge_result),
        }
    }

    async fn get_resources_for_user(
        &self,
        _request: &ApiRequest<'_>,
        user_id: &str,
    ) -> Result<Option<Vec<ResourceDescriptor>>> {
        self.resource_user_ids
            .lock()
            .unwrap()
            .push(user_id.to_string());
        Ok(Some(vec![ResourceDescriptor {
            id: "c1".to_string(),
            name: "DefaultCollection".to_string(),
            url: None,
        }]))
    }

    async fn get_projects_for_resource(
        &self,
        _request: &ApiRequest<'_>,
        _resource_name: &str,
    ) -> Result<Vec<ProjectSummary>> {
        Ok(self.projects.clone())
    }
}

pub fn failing_providers_api() -> ProvidersApiFactory {
    lazy_providers_api(|| async {
        Err::<Arc<dyn ProvidersApi>, _>(IntegrationError::Config(
            "providers API unavailable".to_string(),
        ))
    })
}

pub fn sample_pull_request() -> PullRequest {
    PullRequest {
        provider: "azureDevOpsServer:tfs.corp.local".to_string(),
        id: "17".to_string(),
        title: "Add retry to build step".to_string(),
        url: Some("https://tfs.corp.local/org1/_git/repo1/pullrequest/17".to_string()),
        state: PullRequestState::Opened,
        is_draft: false,
        author: None,
        created_date: None,
        closed_date: None,
        refs: Some(PullRequestRefs {
            base: PullRequestRef {
                branch: "main".to_string(),
                sha: Some("1111111".to_string()),
            },
            head: PullRequestRef {
                branch: "feature/retry".to_string(),
                sha: Some("2222222".to_string()),
            },
        }),
        project: Some(PullRequestProject {
            owner: "org1".to_string(),
            repo: "repo1".to_string(),
            project_id: None,
            repository_id: None,
        }),
    }
}
