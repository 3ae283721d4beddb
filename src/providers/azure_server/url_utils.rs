use url::Url;

use crate::error::{IntegrationError, Result};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Percent-encodes each segment of a slash-separated path, keeping the slashes.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn api_url(base_url: &str, path: &str) -> Result<Url> {
    Url::parse(&format!("{}/{}", base_url.trim_end_matches('/'), path))
        .map_err(|e| IntegrationError::Config(format!("Invalid API URL: {e}")))
}

pub fn repository_api_path(owner: &str, name: &str) -> String {
    format!(
        "{}/_apis/git/repositories/{}",
        encode_path(owner),
        urlencoding::encode(name)
    )
}

pub fn pull_request_web_url(base_url: &str, owner: &str, name: &str, id: u64) -> String {
    format!(
        "{}/{}/_git/{}/pullrequest/{id}",
        base_url.trim_end_matches('/'),
        encode_path(owner),
        urlencoding::encode(name)
    )
}

pub fn work_item_web_url(base_url: &str, owner: &str, id: u64) -> String {
    format!(
        "{}/{}/_workitems/edit/{id}",
        base_url.trim_end_matches('/'),
        encode_path(owner)
    )
}

pub fn branch_ref(branch: &str) -> String {
    if branch.starts_with("refs/") {
        branch.to_string()
    } else {
        format!("{BRANCH_REF_PREFIX}{branch}")
    }
}

pub fn branch_name(ref_name: &str) -> &str {
    ref_name.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(ref_name)
}
