use super::AzureServerClient;
use crate::error::Result;
use crate::models::Issue;
use crate::providers::azure_server::dto::WorkItemDto;
use crate::providers::azure_server::url_utils::{api_url, encode_path};
use crate::providers::ServerRequest;

impl AzureServerClient {
    /// Work items live at project level, so only the owner path is used.
    pub(super) async fn fetch_work_item(
        &self,
        request: &ServerRequest<'_>,
        id: &str,
    ) -> Result<Option<Issue>> {
        let path = format!(
            "{}/_apis/wit/workitems/{}",
            encode_path(request.owner),
            urlencoding::encode(id)
        );
        let url = api_url(request.base_url, &path)?;

        let work_item: Option<WorkItemDto> = self
            .rest
            .fetch_optional(self.rest.get(url, request.access_token), "Fetch work item")
            .await?;

        Ok(work_item
            .map(|dto| dto.into_issue(request.key.as_str(), request.base_url, request.owner)))
    }
}
