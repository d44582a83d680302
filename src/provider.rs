use anyhow::{Result, bail};

use crate::{
    branch::normalize_directory,
    model::{ExistingPr, PullRequestRequest},
};

mod azure;

pub use azure::AzureDevOps;

pub trait Provider {
    /// List the updates that already have a branch on the remote.
    ///
    /// Branches whose name cannot be parsed are skipped.
    fn existing_pull_requests(&self) -> Result<Vec<ExistingPr>>;

    /// Push the updated files to a new branch and open a pull request for it.
    ///
    /// Nothing is rolled back: if opening the pull request fails the branch stays on the
    /// remote.
    fn create_pull_request(&self, request: &PullRequestRequest) -> Result<()>;

    /// Existing pull requests wrapped in a single group.
    ///
    /// A failed listing is logged and reported as no groups at all. Use
    /// [`Provider::existing_pull_requests`] to see the error.
    fn get_existing_prs(&self) -> Vec<Vec<ExistingPr>> {
        match self.existing_pull_requests() {
            Ok(existing) => vec![existing],
            Err(err) => {
                log::warn!("Failed to list existing pull requests: {err:#}");
                vec![]
            }
        }
    }
}

/// The repository and directory that updates are applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub package_manager: String,
    pub organization: String,
    pub project: String,
    pub repository: String,
    /// Always with a leading and a trailing slash.
    pub directory: String,
}

impl RepositoryTarget {
    /// Build a target from a locator like `org/project/_git/repo`.
    ///
    /// The locator needs at least four segments. The first two are the organization and the
    /// project, the last one is the repository.
    pub fn new(package_manager: &str, locator: &str, directory: &str) -> Result<Self> {
        let segments = locator.split('/').collect::<Vec<&str>>();
        if segments.len() < 4 {
            bail!("Failed to parse repository {locator}: expected org/project/.../repo")
        }

        let organization = segments[0];
        let project = segments[1];
        let repository = segments[segments.len() - 1];
        if organization.is_empty() || project.is_empty() || repository.is_empty() {
            bail!("Failed to parse repository {locator}: empty organization, project or repository")
        }
        if package_manager.is_empty() {
            bail!("Package manager must not be empty")
        }

        Ok(Self {
            package_manager: package_manager.into(),
            organization: organization.into(),
            project: project.into(),
            repository: repository.into(),
            directory: normalize_directory(directory),
        })
    }
}
