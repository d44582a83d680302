use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use crate::{
    branch::{self, BRANCH_PREFIX},
    credential::{self, Credential},
    http::{BasicAuth, Gateway},
    model::{ExistingPr, FileChange, PullRequestRequest},
    provider::{Provider, RepositoryTarget},
};

const AZURE_DEVOPS_API: &str = "https://dev.azure.com";
const DEFAULT_TARGET_BRANCH: &str = "refs/heads/main";

const PUSHES_API_VERSION: &str = "7.1-preview.2";
const PULL_REQUESTS_API_VERSION: &str = "7.1-preview.1";
const REFS_API_VERSION: &str = "7.1-preview.1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Push<'a> {
    ref_updates: Vec<RefUpdate<'a>>,
    commits: Vec<Commit<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefUpdate<'a> {
    name: &'a str,
    old_object_id: &'a str,
}

#[derive(Serialize)]
struct Commit<'a> {
    comment: &'a str,
    changes: Vec<Change>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Change {
    #[serde(rename = "changeType")]
    kind: &'static str,
    item: Item,
    new_content: NewContent,
}

#[derive(Serialize)]
struct Item {
    path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewContent {
    content: String,
    content_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PullRequest<'a> {
    source_ref_name: &'a str,
    target_ref_name: &'a str,
    title: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct RefList {
    value: Vec<Ref>,
}

#[derive(Deserialize)]
struct Ref {
    name: String,
}

impl<'a> Push<'a> {
    fn new(branch: &'a str, request: &'a PullRequestRequest) -> Self {
        Self {
            ref_updates: vec![RefUpdate {
                name: branch,
                old_object_id: &request.base_commit_sha,
            }],
            commits: vec![Commit {
                comment: &request.commit_message,
                changes: request.updated_files.iter().map(Change::edit).collect(),
            }],
        }
    }
}

impl Change {
    fn edit(file: &FileChange) -> Self {
        Self {
            kind: "edit",
            item: Item {
                path: format!("{}{}", branch::normalize_directory(&file.directory), file.name),
            },
            new_content: NewContent {
                content: STANDARD.encode(file.content.as_bytes()),
                content_type: "base64encoded",
            },
        }
    }
}

pub struct AzureDevOpsBuilder {
    package_manager: String,
    repository: String,
    directory: String,
    credentials: Vec<Credential>,
    api_url: Option<String>,
    target_branch: Option<String>,
}

impl AzureDevOpsBuilder {
    pub fn new(package_manager: &str, repository: &str) -> Self {
        Self {
            package_manager: package_manager.into(),
            repository: repository.into(),
            directory: "/".into(),
            credentials: vec![],
            api_url: None,
            target_branch: None,
        }
    }

    pub fn directory(mut self, directory: &str) -> Self {
        self.directory = directory.into();
        self
    }

    pub fn credentials(mut self, credentials: Vec<Credential>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Use a different server, e.g. an on-premises Azure DevOps Server.
    pub fn api_url(mut self, api_url: &str) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    pub fn target_branch(mut self, target_branch: &str) -> Self {
        self.target_branch = Some(target_branch.into());
        self
    }

    pub fn build(self) -> Result<AzureDevOps> {
        let target =
            RepositoryTarget::new(&self.package_manager, &self.repository, &self.directory)?;

        let api_url = self.api_url.as_deref().unwrap_or(AZURE_DEVOPS_API);
        let api_url =
            Url::parse(api_url).with_context(|| format!("Failed to parse API URL {api_url}"))?;
        if api_url.cannot_be_a_base() {
            bail!("API URL {api_url} cannot be used as a base URL")
        }
        let Some(host) = api_url.host_str() else {
            bail!("API URL {api_url} has no host")
        };

        let auth = credential::resolve(&self.credentials, host)?
            .map(|credential| BasicAuth::from_credential(&credential))
            .transpose()
            .with_context(|| format!("Invalid credential for {host}"))?;
        if auth.is_none() {
            log::debug!("No credential for {host}, sending unauthenticated requests");
        }

        let target_branch = match self.target_branch {
            Some(branch) if branch.starts_with("refs/") => branch,
            Some(branch) => format!("refs/heads/{branch}"),
            None => DEFAULT_TARGET_BRANCH.into(),
        };

        Ok(AzureDevOps {
            target,
            api_url,
            target_branch,
            auth,
            gateway: Gateway::new()?,
        })
    }
}

/// Provider for repositories hosted on Azure DevOps.
pub struct AzureDevOps {
    target: RepositoryTarget,
    api_url: Url,
    /// Full ref of the branch pull requests are opened against.
    target_branch: String,
    auth: Option<BasicAuth>,
    gateway: Gateway,
}

impl AzureDevOps {
    pub fn builder(package_manager: &str, repository: &str) -> AzureDevOpsBuilder {
        AzureDevOpsBuilder::new(package_manager, repository)
    }

    /// URL of a git endpoint of the repository.
    fn repo_api_url(&self, endpoint: &str) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("API URL {} cannot be used as a base URL", self.api_url))?
            .pop_if_empty()
            .extend([
                self.target.organization.as_str(),
                self.target.project.as_str(),
                "_apis",
                "git",
                "repositories",
                self.target.repository.as_str(),
                endpoint,
            ]);
        Ok(url)
    }
}

impl Provider for AzureDevOps {
    fn existing_pull_requests(&self) -> Result<Vec<ExistingPr>> {
        let mut url = self.repo_api_url("refs")?;
        url.query_pairs_mut()
            .append_pair("filter", BRANCH_PREFIX.trim_start_matches("refs/"))
            .append_pair("filterContains", &self.target.directory)
            .append_pair("api-version", REFS_API_VERSION);

        let refs = self
            .gateway
            .get_json::<RefList>(&url, self.auth.as_ref())
            .context("Failed to list update branches")?;

        let existing = refs
            .body
            .value
            .iter()
            .filter_map(|r| {
                let parsed = branch::parse_branch_name(&self.target.directory, &r.name);
                if parsed.is_none() {
                    log::debug!("Skipping branch {} as it is not an update branch", r.name);
                }
                parsed
            })
            .collect();

        Ok(existing)
    }

    fn create_pull_request(&self, request: &PullRequestRequest) -> Result<()> {
        let Some(dependency) = request.dependencies.first() else {
            bail!("Cannot open a pull request without any dependency")
        };
        if request.updated_files.is_empty() {
            bail!("Cannot open a pull request without any updated file")
        }
        if request.dependencies.len() > 1 {
            log::warn!(
                "Only {} names the branch, the other {} dependencies share it",
                dependency.name,
                request.dependencies.len() - 1
            );
        }

        let branch = branch::branch_name(
            &self.target.package_manager,
            &self.target.directory,
            dependency,
        );

        let mut url = self.repo_api_url("pushes")?;
        url.query_pairs_mut()
            .append_pair("api-version", PUSHES_API_VERSION);

        log::info!("Pushing {branch}...");
        self.gateway
            .request(
                &Method::POST,
                &url,
                self.auth.as_ref(),
                Some(&Push::new(&branch, request)),
            )
            .with_context(|| format!("Failed to push {branch}"))?;

        let pull_request = PullRequest {
            source_ref_name: &branch,
            target_ref_name: &self.target_branch,
            title: &request.pr_title,
            description: &request.pr_body,
        };

        let mut url = self.repo_api_url("pullrequests")?;
        url.query_pairs_mut()
            .append_pair("api-version", PULL_REQUESTS_API_VERSION);

        log::info!("Opening Pull Request for {branch}...");
        self.gateway
            .request(&Method::POST, &url, self.auth.as_ref(), Some(&pull_request))
            .with_context(|| format!("Failed to open Pull Request for {branch}"))?;

        Ok(())
    }
}
