mod cli;

use std::{ffi::OsStr, process::Output};

use anyhow::Result;
use assert_cmd::Command;

/// Run updatebot with a clean environment.
pub fn updatebot<I, S>(args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::cargo_bin("updatebot")?
        .env_remove("UPDATEBOT_PACKAGE_MANAGER")
        .env_remove("UPDATEBOT_REPOSITORY")
        .env_remove("UPDATEBOT_CREDENTIALS")
        .env_remove("UPDATEBOT_API_URL")
        .args(args)
        .output()?;
    Ok(output)
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
