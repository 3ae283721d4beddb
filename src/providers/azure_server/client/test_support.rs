use crate::auth::Token;
use crate::integration::{IntegrationId, IntegrationKey};
use crate::providers::ServerRequest;

pub const OWNER: &str = "DefaultCollection/proj";
pub const REPO: &str = "repo1";
/// `Basic` credential for an empty user name and the token `tok`.
pub const BASIC_AUTH: &str = "Basic OnRvaw==";

/// Owns what a [`ServerRequest`] borrows for a mock server.
pub struct Fixture {
    pub key: IntegrationKey,
    pub token: Token,
    pub base_url: String,
}

impl Fixture {
    pub fn new(server: &mockito::Server) -> Self {
        Self {
            key: IntegrationKey::new(IntegrationId::AzureDevOpsServer, &server.host_with_port()),
            token: Token::from("tok"),
            base_url: server.url(),
        }
    }

    pub fn request(&self) -> ServerRequest<'_> {
        ServerRequest {
            key: &self.key,
            access_token: &self.token,
            owner: OWNER,
            name: REPO,
            base_url: &self.base_url,
        }
    }
}

pub fn api_version() -> mockito::Matcher {
    mockito::Matcher::UrlEncoded("api-version".into(), "7.0".into())
}

pub fn pull_request_body(id: u64, status: &str, source_ref: &str) -> serde_json::Value {
    serde_json::json!({
        "pullRequestId": id,
        "status": status,
        "title": format!("Pull request {id}"),
        "creationDate": "2024-03-01T09:30:00Z",
        "sourceRefName": source_ref,
        "targetRefName": "refs/heads/main",
        "lastMergeSourceCommit": { "commitId": "2222222" },
        "lastMergeTargetCommit": { "commitId": "1111111" },
        "repository": { "id": "repo-guid", "name": "repo1", "project": { "id": "project-guid" } }
    })
}
