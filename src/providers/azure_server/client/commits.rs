use log::debug;

use super::AzureServerClient;
use crate::error::Result;
use crate::providers::azure_server::dto::CommitDto;
use crate::providers::azure_server::url_utils::{api_url, repository_api_path};
use crate::providers::ServerRequest;

impl AzureServerClient {
    pub(super) async fn fetch_commit(
        &self,
        request: &ServerRequest<'_>,
        rev: &str,
    ) -> Result<Option<CommitDto>> {
        let path = format!(
            "{}/commits/{}",
            repository_api_path(request.owner, request.name),
            urlencoding::encode(rev)
        );
        let url = api_url(request.base_url, &path)?;

        debug!(
            "Fetching commit {rev} from {}/{}",
            request.owner, request.name
        );
        let commit: Option<CommitDto> = self
            .rest
            .fetch_optional(self.rest.get(url, request.access_token), "Fetch commit")
            .await?;

        if let Some(commit) = &commit {
            debug!("Resolved commit {}", commit.commit_id);
        }
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{api_version, Fixture, BASIC_AUTH};
    use crate::models::AccountOptions;
    use crate::providers::azure_server::AzureServerClient;
    use crate::providers::ServerClient;
    use serde_json::json;

    const COMMIT_PATH: &str = "/DefaultCollection/proj/_apis/git/repositories/repo1/commits/abc123";

    #[tokio::test]
    async fn test_account_for_commit_reads_author() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", COMMIT_PATH)
            .match_query(api_version())
            .match_header("authorization", BASIC_AUTH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "commitId": "abc123",
                    "author": { "name": "Jamie Doe", "email": "jamie@corp.local", "date": "2024-03-01T09:30:00Z" },
                    "committer": { "name": "Build Agent", "email": "agent@corp.local" }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let fixture = Fixture::new(&server);
        let client = AzureServerClient::new().unwrap();

        let author = client
            .get_account_for_commit(&fixture.request(), "abc123", AccountOptions::default())
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(author.name.as_deref(), Some("Jamie Doe"));
        assert_eq!(author.email.as_deref(), Some("jamie@corp.local"));
        assert_eq!(author.provider, fixture.key.to_string());
    }

    #[tokio::test]
    async fn test_unknown_commit_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", COMMIT_PATH)
            .match_query(api_version())
            .with_status(404)
            .create_async()
            .await;
        let fixture = Fixture::new(&server);
        let client = AzureServerClient::new().unwrap();

        let author = client
            .get_account_for_commit(&fixture.request(), "abc123", AccountOptions::default())
            .await
            .unwrap();

        assert_eq!(author, None);
    }

    #[tokio::test]
    async fn test_rejected_token_is_authentication_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", COMMIT_PATH)
            .match_query(api_version())
            .with_status(401)
            .create_async()
            .await;
        let fixture = Fixture::new(&server);
        let client = AzureServerClient::new().unwrap();

        let result = client
            .get_account_for_commit(&fixture.request(), "abc123", AccountOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(crate::error::IntegrationError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_server_error_carries_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", COMMIT_PATH)
            .match_query(api_version())
            .with_status(500)
            .with_body("TF400898: An Internal Error Occurred")
            .create_async()
            .await;
        let fixture = Fixture::new(&server);
        let client = AzureServerClient::new().unwrap();

        let result = client
            .get_account_for_commit(&fixture.request(), "abc123", AccountOptions::default())
            .await;

        match result {
            Err(crate::error::IntegrationError::Api(message)) => {
                assert!(message.contains("500"));
                assert!(message.contains("TF400898"));
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }
}
