use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// One named operation of the integration interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    CurrentAccount,
    ResourcesForUser,
    ProjectsForResources,
    MergePullRequest,
    AccountForCommit,
    AccountForEmail,
    DefaultBranch,
    IssueOrPullRequest,
    Issue,
    PullRequestForBranch,
    PullRequestForCommit,
    RepositoryMetadata,
    SearchMyPullRequests,
    SearchMyIssues,
}

impl Capability {
    pub const ALL: [Capability; 14] = [
        Capability::CurrentAccount,
        Capability::ResourcesForUser,
        Capability::ProjectsForResources,
        Capability::MergePullRequest,
        Capability::AccountForCommit,
        Capability::AccountForEmail,
        Capability::DefaultBranch,
        Capability::IssueOrPullRequest,
        Capability::Issue,
        Capability::PullRequestForBranch,
        Capability::PullRequestForCommit,
        Capability::RepositoryMetadata,
        Capability::SearchMyPullRequests,
        Capability::SearchMyIssues,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::CurrentAccount => "currentAccount",
            Self::ResourcesForUser => "resourcesForUser",
            Self::ProjectsForResources => "projectsForResources",
            Self::MergePullRequest => "mergePullRequest",
            Self::AccountForCommit => "accountForCommit",
            Self::AccountForEmail => "accountForEmail",
            Self::DefaultBranch => "defaultBranch",
            Self::IssueOrPullRequest => "issueOrPullRequest",
            Self::Issue => "issue",
            Self::PullRequestForBranch => "pullRequestForBranch",
            Self::PullRequestForCommit => "pullRequestForCommit",
            Self::RepositoryMetadata => "repositoryMetadata",
            Self::SearchMyPullRequests => "searchMyPullRequests",
            Self::SearchMyIssues => "searchMyIssues",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which collaborator serves a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Unsupported,
    ProvidersApi,
    ServerClient,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityOptions {
    /// Route merges to the generic API client instead of refusing them.
    pub merge_enabled: bool,
}

/// Capability routing, fixed when the adapter is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilityTable(IndexMap<Capability, Backend>);

impl CapabilityTable {
    pub fn for_server(options: CapabilityOptions) -> Self {
        let merge_backend = if options.merge_enabled {
            Backend::ProvidersApi
        } else {
            Backend::Unsupported
        };

        Capability::ALL
            .into_iter()
            .map(|capability| {
                let backend = match capability {
                    Capability::CurrentAccount
                    | Capability::ResourcesForUser
                    | Capability::ProjectsForResources => Backend::ProvidersApi,
                    Capability::MergePullRequest => merge_backend,
                    Capability::AccountForCommit
                    | Capability::IssueOrPullRequest
                    | Capability::PullRequestForBranch
                    | Capability::PullRequestForCommit => Backend::ServerClient,
                    Capability::AccountForEmail
                    | Capability::DefaultBranch
                    | Capability::Issue
                    | Capability::RepositoryMetadata
                    | Capability::SearchMyPullRequests
                    | Capability::SearchMyIssues => Backend::Unsupported,
                };
                (capability, backend)
            })
            .collect()
    }

    pub fn backend(&self, capability: Capability) -> Backend {
        self.0
            .get(&capability)
            .copied()
            .unwrap_or(Backend::Unsupported)
    }

    pub fn is_supported(&self, capability: Capability) -> bool {
        self.backend(capability) != Backend::Unsupported
    }

}

impl FromIterator<(Capability, Backend)> for CapabilityTable {
    fn from_iter<I: IntoIterator<Item = (Capability, Backend)>>(routes: I) -> Self {
        Self(routes.into_iter().collect())
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::for_server(CapabilityOptions::default())
    }
}
