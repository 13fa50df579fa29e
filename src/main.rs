//! Bundlewatch - Origin package update watcher
//!
//! Main entry point for the bundlewatch CLI.

use bundlewatch::config::{CredentialChain, WatchConfig, DEFAULT_CONFIG_PATH};
use bundlewatch::detect::{origins_from_config, UpdateDetector};
use bundlewatch::git::GitSource;
use bundlewatch::github::GithubClient;
use bundlewatch::obs::{ObsClient, ObsError};
use bundlewatch::report::{format_updates_md, substitute, ReportRow, UpdateReport};
use bundlewatch::timestamp::{human_readable, WatermarkFile};
use bundlewatch::{style, BundlewatchError, Timestamp};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

/// Bundlewatch - watch build-service origin packages for updates
#[derive(Parser, Debug)]
#[command(name = "bundlewatch")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize the last-run timestamp file with the current time
    Init {
        /// File holding the last execution time in Unix seconds
        #[arg(long, default_value = ".last_execution")]
        last_timestamp_file: PathBuf,

        /// Override an existing timestamp file
        #[arg(long)]
        force: bool,
    },

    /// List packages missing from the [origins] table in the config file
    NotInConf {
        /// Config file location, TOML format
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config_path: PathBuf,

        /// Include all subprojects of the bundle project
        #[arg(long)]
        search_subprojects: bool,

        /// Exclude subprojects containing this string; can be used
        /// multiple times
        #[arg(long)]
        exclude_subproject: Vec<String>,

        /// Exclude this package name from the listing; can be used
        /// multiple times
        #[arg(long)]
        exclude_package: Vec<String>,
    },

    /// List all subprojects that contain the specified packages
    SubprojectsContaining {
        /// Config file location, TOML format
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config_path: PathBuf,

        /// Exclude subprojects containing this string; can be used
        /// multiple times
        #[arg(long)]
        exclude_subproject: Vec<String>,

        /// Package names to look for
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// List all packages that were updated in their origin since the last run
    Updates {
        /// File holding the last execution time in Unix seconds
        #[arg(long, default_value = ".last_execution")]
        last_timestamp_file: PathBuf,

        /// Config file location, TOML format
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config_path: PathBuf,

        /// Do not update the last execution timestamp
        #[arg(long)]
        no_update_timestamp: bool,
    },

    /// Create a GitHub issue listing the needed updates
    CreateIssue {
        /// File holding the last execution time in Unix seconds
        #[arg(long, default_value = ".last_execution")]
        last_timestamp_file: PathBuf,

        /// Config file location, TOML format
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config_path: PathBuf,

        /// GitHub OAuth token, can be passed via the environment
        /// variable GHTOKEN
        #[arg(long, env = "GHTOKEN")]
        gh_token: Option<String>,

        /// Do not update the last execution timestamp
        #[arg(long)]
        no_update_timestamp: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = bundlewatch::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", style::error("Error:"), e);
        process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> bundlewatch::Result<()> {
    match cli.command {
        Commands::Init {
            last_timestamp_file,
            force,
        } => handle_init(&last_timestamp_file, force),
        Commands::NotInConf {
            config_path,
            search_subprojects,
            exclude_subproject,
            exclude_package,
        } => {
            handle_not_in_conf(
                &config_path,
                search_subprojects,
                &exclude_subproject,
                &exclude_package,
            )
            .await
        }
        Commands::SubprojectsContaining {
            config_path,
            exclude_subproject,
            packages,
        } => handle_subprojects_containing(&config_path, &exclude_subproject, &packages).await,
        Commands::Updates {
            last_timestamp_file,
            config_path,
            no_update_timestamp,
        } => handle_updates(&last_timestamp_file, &config_path, no_update_timestamp).await,
        Commands::CreateIssue {
            last_timestamp_file,
            config_path,
            gh_token,
            no_update_timestamp,
        } => {
            handle_create_issue(
                &last_timestamp_file,
                &config_path,
                gh_token,
                no_update_timestamp,
            )
            .await
        }
    }
}

fn handle_init(last_timestamp_file: &PathBuf, force: bool) -> bundlewatch::Result<()> {
    let watermark = WatermarkFile::new(last_timestamp_file);
    let written = watermark.init(force)?;

    println!(
        "Initialized {} at {}",
        watermark.path().display(),
        human_readable(written)
    );
    Ok(())
}

async fn handle_not_in_conf(
    config_path: &PathBuf,
    search_subprojects: bool,
    exclude_subproject: &[String],
    exclude_package: &[String],
) -> bundlewatch::Result<()> {
    let config = WatchConfig::load(config_path)?;
    let obs = build_obs_client(&config)?;

    let mut projects = vec![config.obs.bundle_project.clone()];
    if search_subprojects {
        for subproject in list_subprojects_or_warn(&obs, &config.obs.bundle_project).await? {
            if !projects.contains(&subproject) {
                projects.push(subproject);
            }
        }
    }

    let mut rows = Vec::new();
    for project in &projects {
        if is_excluded(project, exclude_subproject) {
            continue;
        }

        let packages = match obs.list_packages(project).await {
            Ok(packages) => packages,
            Err(ObsError::Transport(e)) => {
                tracing::warn!(project = %project, error = %e, "skipping project");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        for package in packages {
            if exclude_package.contains(&package) {
                continue;
            }
            if !config.origins.contains_key(&package) {
                rows.push(vec![project.clone(), package]);
            }
        }
    }

    print_table(
        Some(&format!(
            "Packages missing from {}",
            config_path.display()
        )),
        &["Project", "Package"],
        &rows,
    );
    Ok(())
}

async fn handle_subprojects_containing(
    config_path: &PathBuf,
    exclude_subproject: &[String],
    packages: &[String],
) -> bundlewatch::Result<()> {
    let config = WatchConfig::load(config_path)?;
    let obs = build_obs_client(&config)?;

    let mut projects = vec![config.obs.bundle_project.clone()];
    for subproject in list_subprojects_or_warn(&obs, &config.obs.bundle_project).await? {
        if !projects.contains(&subproject) {
            projects.push(subproject);
        }
    }

    let mut rows = Vec::new();
    for package in packages {
        for project in &projects {
            if is_excluded(project, exclude_subproject) {
                continue;
            }

            if obs.package_in_project(package, project).await {
                rows.push(vec![package.clone(), project.clone()]);
            }
        }
    }

    print_table(None, &["Package", "Project"], &rows);
    Ok(())
}

async fn handle_updates(
    last_timestamp_file: &PathBuf,
    config_path: &PathBuf,
    no_update_timestamp: bool,
) -> bundlewatch::Result<()> {
    let watermark = WatermarkFile::new(last_timestamp_file);
    let last_check = watermark.read()?;
    let config = WatchConfig::load(config_path)?;
    let now = bundlewatch::timestamp::now();

    let report = run_detection(&config, last_check).await?;

    print_origin_table("Packages Updated in Origin", &report.updated);
    if !report.failed.is_empty() {
        print_origin_table("Packages that Failed to Check", &report.failed);
    }

    if !no_update_timestamp {
        watermark.write(now)?;
    }
    Ok(())
}

async fn handle_create_issue(
    last_timestamp_file: &PathBuf,
    config_path: &PathBuf,
    gh_token: Option<String>,
    no_update_timestamp: bool,
) -> bundlewatch::Result<()> {
    let gh_token = gh_token.ok_or(BundlewatchError::MissingGithubToken)?;

    let watermark = WatermarkFile::new(last_timestamp_file);
    let last_check = watermark.read()?;
    let config = WatchConfig::load(config_path)?;
    let github = config.github()?;
    let now = bundlewatch::timestamp::now();

    let report = run_detection(&config, last_check).await?;

    let body = substitute(
        &github.issue.body,
        &[
            ("last_execution", human_readable(last_check)),
            ("last_execution_ts", last_check.to_string()),
            ("now", human_readable(now)),
            ("updates", format_updates_md(&report)),
        ],
    );

    let client = GithubClient::new(gh_token)?;
    let issue = client
        .create_issue_in_board(
            &github.repo,
            &github.issue.title,
            &body,
            &github.issue.labels,
            &github.project_board_id,
        )
        .await?;

    println!("View the issue at {}", issue.html_url);

    if !no_update_timestamp {
        watermark.write(now)?;
    }
    Ok(())
}

/// One detection pass: resolve credentials, build both metadata sources,
/// probe every configured origin.
async fn run_detection(
    config: &WatchConfig,
    last_check: Timestamp,
) -> bundlewatch::Result<UpdateReport> {
    let obs = build_obs_client(config)?;
    let git = GitSource::new(&config.obs.gitserver_baseurl);
    let origins = origins_from_config(config);

    tracing::info!(origins = origins.len(), "checking for updates");

    UpdateDetector::new(&obs, &git).run(last_check, &origins).await
}

fn build_obs_client(config: &WatchConfig) -> bundlewatch::Result<ObsClient> {
    let credentials = CredentialChain::default_chain().resolve(&config.obs.api_baseurl)?;
    ObsClient::new(&config.obs.api_baseurl, credentials)
}

/// Resolve subprojects, downgrading a transport failure to a warning so
/// the listing still covers the main project.
async fn list_subprojects_or_warn(
    obs: &ObsClient,
    project: &str,
) -> bundlewatch::Result<Vec<String>> {
    match obs.list_subprojects(project).await {
        Ok(subprojects) => Ok(subprojects),
        Err(ObsError::Transport(e)) => {
            tracing::warn!(error = %e, "could not list subprojects");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn is_excluded(project: &str, exclude_subproject: &[String]) -> bool {
    exclude_subproject
        .iter()
        .any(|excluded| project.contains(excluded.as_str()))
}

fn print_origin_table(title: &str, rows: &[ReportRow]) {
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.bundle_name.clone(),
                row.project.clone(),
                row.package.clone(),
            ]
        })
        .collect();

    print_table(
        Some(title),
        &[
            "Bundle Package Name",
            "Origin Project Name",
            "Origin Package Name",
        ],
        &table_rows,
    );
}

fn print_table(title: Option<&str>, headers: &[&str], rows: &[Vec<String>]) {
    if let Some(title) = title {
        println!("\n{}", style::header(title));
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(header, &width)| format!("{:<width$}", header))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", style::header(&header_line));
    println!("{}", style::dim(&"-".repeat(header_line.len())));

    if rows.is_empty() {
        println!("{}", style::dim("(none)"));
        return;
    }

    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{:<width$}", cell))
            .collect::<Vec<_>>()
            .join("  ");
        println!("{}", line);
    }
}
