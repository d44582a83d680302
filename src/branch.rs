use crate::model::{DependencyUpdate, ExistingPr};

/// Namespace under which all update branches live.
pub const BRANCH_PREFIX: &str = "refs/heads/dependabot/";

/// Ensure that a directory always has a leading and a trailing slash.
pub fn normalize_directory(directory: &str) -> String {
    let mut normalized = String::with_capacity(directory.len() + 2);
    if !directory.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(directory);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Build the ref of the branch that proposes `dependency`.
///
/// The ref is `refs/heads/dependabot/<package manager><directory><name>-<version>`. Neither the
/// name nor the directory are escaped, so `-` and `/` inside them are ambiguous when parsing.
pub fn branch_name(
    package_manager: &str,
    directory: &str,
    dependency: &DependencyUpdate,
) -> String {
    format!(
        "{BRANCH_PREFIX}{package_manager}{}{}-{}",
        normalize_directory(directory),
        dependency.name,
        dependency.version
    )
}

/// Recover the dependency from the ref of an existing update branch.
///
/// When the ref still carries the directory the name may contain slashes (e.g. scoped npm
/// packages). Otherwise only the last path segment is considered. The version is everything
/// after the last `-` and never contains a `/`.
pub fn parse_branch_name(directory: &str, ref_name: &str) -> Option<ExistingPr> {
    let tail = strip_directory(directory, ref_name)
        .unwrap_or_else(|| ref_name.rsplit('/').next().unwrap_or(ref_name));

    let (name, version) = tail.rsplit_once('-')?;
    if name.is_empty() || version.is_empty() || name.ends_with('/') || version.contains('/') {
        return None;
    }

    Some(ExistingPr::new(name, version))
}

/// Strip `refs/heads/dependabot/<package manager><directory>` from a ref.
fn strip_directory<'a>(directory: &str, ref_name: &'a str) -> Option<&'a str> {
    let rest = ref_name.strip_prefix(BRANCH_PREFIX)?;
    let (_, rest) = rest.split_once('/')?;
    let directory = normalize_directory(directory);
    rest.strip_prefix(&directory[1..])
        .filter(|tail| !tail.is_empty())
}
