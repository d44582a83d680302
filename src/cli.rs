use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::StatusCode;

use crate::{
    config::{self, arg_or_env},
    credential::{self, Credential},
    http::HttpError,
    model::PullRequestRequest,
    provider::{AzureDevOps, Provider},
};

/// The default log level.
///
/// 2 corresponds to the level INFO.
const DEFAULT_LOG_LEVEL: usize = 2;

#[derive(Parser)]
#[command(version)]
pub struct Cli {
    /// Silence all output
    #[arg(short, long)]
    quiet: bool,
    /// Verbose mode (-v, -vv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the updates that already have a pull request
    List(ListArgs),
    /// Push updated files to a new branch and open a pull request
    Create(CreateArgs),
}

#[derive(Args)]
struct RepositoryArgs {
    /// Package manager of the updated manifests, e.g. npm
    ///
    /// Falls back to `UPDATEBOT_PACKAGE_MANAGER`.
    #[arg(short, long)]
    package_manager: Option<String>,
    /// Repository in the form {org}/{project}/_git/{repo}
    ///
    /// Falls back to `UPDATEBOT_REPOSITORY`.
    #[arg(short, long)]
    repo: Option<String>,
    /// Directory of the manifests inside the repository
    #[arg(short, long, default_value = "/")]
    directory: String,
    /// JSON file with a list of credentials
    ///
    /// Falls back to `UPDATEBOT_CREDENTIALS`. Without credentials requests are unauthenticated.
    #[arg(short, long)]
    credentials: Option<PathBuf>,
    /// Base URL of the API
    ///
    /// Falls back to `UPDATEBOT_API_URL` and then to <https://dev.azure.com>.
    #[arg(long)]
    api_url: Option<String>,
    /// Branch that pull requests target
    #[arg(long)]
    target_branch: Option<String>,
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    repository: RepositoryArgs,
    /// Print the result as JSON grouped the way the orchestrator expects
    ///
    /// A failed listing prints an empty list instead of failing.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CreateArgs {
    #[command(flatten)]
    repository: RepositoryArgs,
    /// JSON file describing the pull request
    payload: PathBuf,
}

impl Cli {
    pub fn init(module: &str) -> ExitCode {
        let cli = Self::parse();

        let _ = stderrlog::new()
            .module(module)
            .show_level(false)
            .quiet(cli.quiet)
            .verbosity(DEFAULT_LOG_LEVEL + usize::from(cli.verbose))
            .init();

        match cli.commands.call() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                // When at least one -v is added, the source of the error is also printed.
                if DEFAULT_LOG_LEVEL + usize::from(cli.verbose) >= 3 {
                    log::error!("{err:#}");
                } else {
                    log::error!("{err}");
                }
                ExitCode::FAILURE
            }
        }
    }
}

impl Commands {
    pub fn call(self) -> Result<()> {
        match self {
            Self::List(args) => list(&args),
            Self::Create(args) => create(&args),
        }
    }
}

impl RepositoryArgs {
    fn provider(&self) -> Result<AzureDevOps> {
        let package_manager =
            arg_or_env(self.package_manager.clone(), "UPDATEBOT_PACKAGE_MANAGER")?;
        let repo = arg_or_env(self.repo.clone(), "UPDATEBOT_REPOSITORY")?;

        let credentials = match self
            .credentials
            .clone()
            .or_else(|| config::optional_env("UPDATEBOT_CREDENTIALS").map(PathBuf::from))
        {
            Some(path) => read_credentials(&path)?,
            None => vec![],
        };

        let mut builder = AzureDevOps::builder(&package_manager, &repo)
            .directory(&self.directory)
            .credentials(credentials);

        if let Some(api_url) = self
            .api_url
            .clone()
            .or_else(|| config::optional_env("UPDATEBOT_API_URL"))
        {
            builder = builder.api_url(&api_url);
        }
        if let Some(target_branch) = &self.target_branch {
            builder = builder.target_branch(target_branch);
        }

        builder
            .build()
            .with_context(|| format!("Failed to set up provider for {repo}"))
    }
}

fn read_credentials(path: &Path) -> Result<Vec<Credential>> {
    let credentials = credential::from_file(path)?;
    log::debug!("Read {} credentials from {path:?}", credentials.len());
    Ok(credentials)
}

fn list(args: &ListArgs) -> Result<()> {
    let provider = args.repository.provider()?;

    log::info!("Listing existing update branches...");
    let mut stdout = io::stdout().lock();

    if args.json {
        // Nested and lenient, as consumed by the update orchestrator.
        let existing = provider.get_existing_prs();
        serde_json::to_writer_pretty(&mut stdout, &existing)
            .context("Failed to serialize existing pull requests")?;
        writeln!(stdout)?;
    } else {
        for pr in &provider.existing_pull_requests()? {
            writeln!(stdout, "{} {}", pr.dependency_name, pr.dependency_version)?;
        }
    }

    Ok(())
}

fn create(args: &CreateArgs) -> Result<()> {
    let payload = fs::read_to_string(&args.payload)
        .with_context(|| format!("Failed to read {:?}", args.payload))?;
    let request: PullRequestRequest =
        serde_json::from_str(&payload).context("Failed to deserialize pull request payload")?;

    let provider = args.repository.provider()?;
    if let Err(err) = provider.create_pull_request(&request) {
        if err.downcast_ref::<HttpError>().and_then(HttpError::status) == Some(StatusCode::CONFLICT)
        {
            log::warn!("The update branch seems to exist already");
        }
        return Err(err);
    }

    log::info!("Opened Pull Request: {}", request.pr_title);

    Ok(())
}
