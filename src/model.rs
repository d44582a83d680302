use serde::{Deserialize, Serialize};

/// A single dependency that is bumped to a new version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DependencyUpdate {
    pub name: String,
    pub version: String,
}

#[cfg(test)]
impl DependencyUpdate {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// The full new content of a file that is part of the update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileChange {
    pub directory: String,
    pub name: String,
    pub content: String,
}

#[cfg(test)]
impl FileChange {
    pub fn new(directory: &str, name: &str, content: &str) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Everything needed to propose an update as a pull request.
///
/// Only the first dependency names the branch. Grouped updates therefore share one branch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRequest {
    pub base_commit_sha: String,
    pub updated_files: Vec<FileChange>,
    pub commit_message: String,
    pub pr_title: String,
    pub pr_body: String,
    pub dependencies: Vec<DependencyUpdate>,
}

/// An update that has already been proposed, recovered from the name of its branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingPr {
    pub dependency_name: String,
    pub dependency_version: String,
}

impl ExistingPr {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            dependency_name: name.into(),
            dependency_version: version.into(),
        }
    }
}
