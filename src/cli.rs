use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::auth::{Session, Token};
use crate::config::ServerConfig;
use crate::integration::{
    lazy_providers_api, AzureDevOpsServerIntegration, Capability, MergeOutcome, Outcome,
};
use crate::models::{
    AccountOptions, IssueOrPullRequest, MergeMethod, MergeOptions, ProjectDescriptor,
    RepositoryDescriptor, ResourceDescriptor,
};
use crate::providers::azure_server::{AzureProvidersApi, AzureServerClient};
use crate::providers::{ProvidersApi, ServerClient};

#[derive(Parser)]
#[command(name = "azdo-server")]
#[command(author, version, about = "Azure DevOps Server integration", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Server domain, optionally with a port and virtual directory (e.g. "tfs.corp.local:8080/tfs")
    #[arg(short, long, env = "AZDO_SERVER_DOMAIN")]
    domain: String,

    /// Personal access token
    #[arg(short, long, env = "AZDO_SERVER_TOKEN")]
    token: Option<String>,

    /// Protocol to reach the server with, "https:" when omitted
    #[arg(long, env = "AZDO_SERVER_PROTOCOL")]
    protocol: Option<String>,

    /// Allow merging pull requests
    #[arg(long, default_value_t = false)]
    enable_merge: bool,
}

#[derive(Args)]
struct RepositoryArgs {
    /// Repository as "collection/project/repo"
    #[arg(short, long, value_parser = parse_repository)]
    repository: RepositoryDescriptor,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the integration identity and which capabilities it supports
    Capabilities,
    /// Show the account the token belongs to
    Whoami,
    /// List project collections visible to the token
    Collections,
    /// List team projects, across all collections unless some are named
    Projects {
        /// Collection name (repeatable)
        #[arg(short, long)]
        collection: Vec<String>,
    },
    /// Resolve the author of a commit
    AccountForCommit {
        #[command(flatten)]
        repo: RepositoryArgs,

        /// Commit id
        #[arg(long)]
        rev: String,

        /// Avatar size in pixels
        #[arg(long)]
        avatar_size: Option<u32>,
    },
    /// Resolve an account by email address
    AccountForEmail {
        #[command(flatten)]
        repo: RepositoryArgs,

        #[arg(long)]
        email: String,
    },
    /// Show a repository's default branch
    DefaultBranch {
        #[command(flatten)]
        repo: RepositoryArgs,
    },
    /// Look up a pull request or work item by id
    IssueOrPr {
        #[command(flatten)]
        repo: RepositoryArgs,

        #[arg(long)]
        id: String,
    },
    /// Look up a work item in a project
    Issue {
        /// Collection the project belongs to
        #[arg(short, long)]
        collection: String,

        /// Project name
        #[arg(short = 'P', long)]
        project: String,

        #[arg(long)]
        id: String,
    },
    /// Find the active pull request for a branch
    PrForBranch {
        #[command(flatten)]
        repo: RepositoryArgs,

        #[arg(short, long)]
        branch: String,
    },
    /// Find the pull request that introduced a commit
    PrForCommit {
        #[command(flatten)]
        repo: RepositoryArgs,

        #[arg(long)]
        rev: String,
    },
    /// Show repository metadata
    RepoMetadata {
        #[command(flatten)]
        repo: RepositoryArgs,
    },
    /// Search pull requests involving the current user
    SearchPrs {
        /// Repositories to search, as "collection/project/repo" (repeatable)
        #[arg(short, long, value_parser = parse_repository)]
        repository: Vec<RepositoryDescriptor>,
    },
    /// Search work items assigned to the current user
    SearchIssues {
        /// Repositories to search, as "collection/project/repo" (repeatable)
        #[arg(short, long, value_parser = parse_repository)]
        repository: Vec<RepositoryDescriptor>,
    },
    /// Merge a pull request (requires --enable-merge)
    MergePr {
        #[command(flatten)]
        repo: RepositoryArgs,

        /// Pull request id
        #[arg(long)]
        id: String,

        #[arg(long, value_enum)]
        merge_method: Option<MergeMethod>,
    },
}

/// Splits "collection/project/repo" into owner "collection/project" and name "repo".
fn parse_repository(value: &str) -> std::result::Result<RepositoryDescriptor, String> {
    let value = value.trim().trim_matches('/');
    match value.rsplit_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            Ok(RepositoryDescriptor::new(owner, name))
        }
        _ => Err(format!(
            "expected \"collection/project/repo\", got \"{value}\""
        )),
    }
}

fn build_integration(config: &ServerConfig) -> Result<AzureDevOpsServerIntegration> {
    let server_client: Arc<dyn ServerClient> = Arc::new(AzureServerClient::new()?);
    let providers_api = lazy_providers_api(|| async {
        AzureProvidersApi::new().map(|api| Arc::new(api) as Arc<dyn ProvidersApi>)
    });

    Ok(AzureDevOpsServerIntegration::with_options(
        config.domain.clone(),
        providers_api,
        Some(server_client),
        config.capability_options(),
    ))
}

fn report<T: Serialize>(outcome: &Outcome<T>) -> Result<serde_json::Value> {
    if let Outcome::Unsupported(capability) = outcome {
        warn!("{capability} is not supported by Azure DevOps Server");
    }
    Ok(serde_json::to_value(outcome)?)
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let config = ServerConfig::new(
            &self.connection.domain,
            self.connection.protocol.as_deref(),
            self.connection.enable_merge,
        )?;
        let integration = build_integration(&config)?;
        let session = config.session(Token::from(
            self.connection.token.clone().unwrap_or_default(),
        ));

        info!(
            "Using {} at {}",
            integration.key(),
            integration.api_base_url(Some(&session))
        );

        let output = self.run(&integration, &session).await?;
        self.write_output(&output)
    }

    async fn run(
        &self,
        integration: &AzureDevOpsServerIntegration,
        session: &Session,
    ) -> Result<serde_json::Value> {
        match &self.command {
            Commands::Capabilities => Ok(json!({
                "key": integration.key(),
                "id": integration.id(),
                "name": integration.name(),
                "domain": integration.domain(),
                "baseUrl": integration.api_base_url(Some(session)),
                "authProvider": integration.auth_provider(),
                "capabilities": integration.capabilities(),
            })),
            Commands::Whoami => report(&integration.get_current_account(session).await?),
            Commands::Collections => report(&integration.get_resources_for_user(session).await?),
            Commands::Projects { collection } => {
                let resources: Vec<ResourceDescriptor> = if collection.is_empty() {
                    match integration.get_resources_for_user(session).await? {
                        Outcome::Found(resources) => resources,
                        outcome => return report(&outcome),
                    }
                } else {
                    collection
                        .iter()
                        .map(|name| ResourceDescriptor {
                            id: name.clone(),
                            name: name.clone(),
                            url: None,
                        })
                        .collect()
                };
                report(
                    &integration
                        .get_projects_for_resources(session, &resources)
                        .await?,
                )
            }
            Commands::AccountForCommit {
                repo,
                rev,
                avatar_size,
            } => {
                let options = AccountOptions {
                    avatar_size: *avatar_size,
                };
                report(
                    &integration
                        .get_account_for_commit(session, &repo.repository, rev, options)
                        .await?,
                )
            }
            Commands::AccountForEmail { repo, email } => report(
                &integration
                    .get_account_for_email(
                        session,
                        &repo.repository,
                        email,
                        AccountOptions::default(),
                    )
                    .await?,
            ),
            Commands::DefaultBranch { repo } => report(
                &integration
                    .get_default_branch(session, &repo.repository)
                    .await?,
            ),
            Commands::IssueOrPr { repo, id } => report(
                &integration
                    .get_issue_or_pull_request(session, &repo.repository, id)
                    .await?,
            ),
            Commands::Issue {
                collection,
                project,
                id,
            } => {
                let project = ProjectDescriptor {
                    id: project.clone(),
                    name: project.clone(),
                    description: None,
                    resource_name: collection.clone(),
                    resource_id: collection.clone(),
                };
                report(&integration.get_issue(session, &project, id).await?)
            }
            Commands::PrForBranch { repo, branch } => report(
                &integration
                    .get_pull_request_for_branch(
                        session,
                        &repo.repository,
                        branch,
                        AccountOptions::default(),
                    )
                    .await?,
            ),
            Commands::PrForCommit { repo, rev } => report(
                &integration
                    .get_pull_request_for_commit(session, &repo.repository, rev)
                    .await?,
            ),
            Commands::RepoMetadata { repo } => {
                let cancellation = CancellationToken::new();
                report(
                    &integration
                        .get_repository_metadata(session, &repo.repository, Some(&cancellation))
                        .await?,
                )
            }
            Commands::SearchPrs { repository } => {
                let repos = (!repository.is_empty()).then_some(repository.as_slice());
                report(&integration.search_my_pull_requests(session, repos).await?)
            }
            Commands::SearchIssues { repository } => {
                let repos = (!repository.is_empty()).then_some(repository.as_slice());
                report(&integration.search_my_issues(session, repos).await?)
            }
            Commands::MergePr {
                repo,
                id,
                merge_method,
            } => {
                if !integration
                    .capabilities()
                    .is_supported(Capability::MergePullRequest)
                {
                    warn!("Merging is disabled, pass --enable-merge to allow it");
                    return Ok(serde_json::to_value(MergeOutcome::Unsupported)?);
                }

                let item = integration
                    .get_issue_or_pull_request(session, &repo.repository, id)
                    .await?;
                let pr = match item {
                    Outcome::Found(IssueOrPullRequest::PullRequest(pr)) => pr,
                    Outcome::Found(other) => {
                        warn!("{} is a work item, not a pull request", other.id());
                        return report(&Outcome::<()>::NotFound);
                    }
                    outcome => return report(&outcome),
                };

                let options = MergeOptions {
                    merge_method: *merge_method,
                };
                let merged = integration.merge_pull_request(session, &pr, options).await;
                if !merged.is_merged() {
                    warn!("Pull request {} was not merged", pr.id);
                }
                Ok(serde_json::to_value(merged)?)
            }
        }
    }

    fn write_output(&self, output: &serde_json::Value) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(output)?
        } else {
            serde_json::to_string(output)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)?;
            info!("Output written to: {}", output_path.display());
        } else {
            println!("{}", json_output);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository_splits_last_segment() {
        let repo = parse_repository("DefaultCollection/Fabrikam/web").unwrap();

        assert_eq!(repo.owner, "DefaultCollection/Fabrikam");
        assert_eq!(repo.name, "web");
    }

    #[test]
    fn test_parse_repository_rejects_bare_name() {
        assert!(parse_repository("web").is_err());
        assert!(parse_repository("/web/").is_err());
    }

    #[test]
    fn test_cli_parses_pr_for_branch() {
        let cli = Cli::try_parse_from([
            "azdo-server",
            "--domain",
            "tfs.corp.local",
            "--token",
            "tok",
            "pr-for-branch",
            "--repository",
            "DefaultCollection/Fabrikam/web",
            "--branch",
            "feature/x",
        ])
        .unwrap();

        assert_eq!(cli.connection.domain, "tfs.corp.local");
        assert!(!cli.connection.enable_merge);
        match cli.command {
            Commands::PrForBranch { repo, branch } => {
                assert_eq!(repo.repository.owner, "DefaultCollection/Fabrikam");
                assert_eq!(branch, "feature/x");
            }
            _ => panic!("expected pr-for-branch"),
        }
    }

    #[test]
    fn test_cli_parses_merge_method() {
        let cli = Cli::try_parse_from([
            "azdo-server",
            "--domain",
            "tfs.corp.local",
            "--enable-merge",
            "merge-pr",
            "--repository",
            "c/p/r",
            "--id",
            "17",
            "--merge-method",
            "squash",
        ])
        .unwrap();

        assert!(cli.connection.enable_merge);
        match cli.command {
            Commands::MergePr { merge_method, .. } => {
                assert_eq!(merge_method, Some(MergeMethod::Squash));
            }
            _ => panic!("expected merge-pr"),
        }
    }

    #[tokio::test]
    async fn test_capabilities_command_describes_integration() {
        let cli = Cli::try_parse_from([
            "azdo-server",
            "--domain",
            "tfs.corp.local",
            "--protocol",
            "http:",
            "capabilities",
        ])
        .unwrap();
        let config = ServerConfig::new("tfs.corp.local", Some("http:"), false).unwrap();
        let integration = build_integration(&config).unwrap();
        let session = config.session(Token::from("tok"));

        let output = cli.run(&integration, &session).await.unwrap();

        assert_eq!(output["key"], "azureDevOpsServer:tfs.corp.local");
        assert_eq!(output["baseUrl"], "http://tfs.corp.local");
        assert_eq!(output["capabilities"]["mergePullRequest"], "unsupported");
        assert_eq!(output["authProvider"]["id"], "azureDevOpsServer");
    }

    #[tokio::test]
    async fn test_disabled_merge_skips_pull_request_lookup() {
        let cli = Cli::try_parse_from([
            "azdo-server",
            "--domain",
            "127.0.0.1:1",
            "--protocol",
            "http:",
            "merge-pr",
            "--repository",
            "c/p/r",
            "--id",
            "17",
        ])
        .unwrap();
        let config = ServerConfig::new("127.0.0.1:1", Some("http:"), false).unwrap();
        let integration = build_integration(&config).unwrap();
        let session = config.session(Token::from("tok"));

        let output = cli.run(&integration, &session).await.unwrap();

        assert_eq!(output, json!({ "status": "unsupported" }));
    }

    #[tokio::test]
    async fn test_unsupported_command_reports_without_network() {
        let cli = Cli::try_parse_from([
            "azdo-server",
            "--domain",
            "tfs.corp.local",
            "default-branch",
            "--repository",
            "c/p/r",
        ])
        .unwrap();
        let config = ServerConfig::new("tfs.corp.local", None, false).unwrap();
        let integration = build_integration(&config).unwrap();
        let session = config.session(Token::from("tok"));

        let output = cli.run(&integration, &session).await.unwrap();

        assert_eq!(
            output,
            json!({ "status": "unsupported", "value": "defaultBranch" })
        );
    }
}
