//! `thirdparty-notice`: build a third-party notice file from a project's
//! direct dependencies.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and pick the ecosystem ([`detector`]).
//! 2. Load config ([`config::load_config`]) and open the cache ([`cache`]).
//! 3. Read the manifest's direct dependencies ([`analyzer`]).
//! 4. Resolve a notice per dependency ([`resolver`]) using the ecosystem's
//!    metadata provider ([`registry`]) and the license source chain ([`license`]).
//! 5. Write the notice ([`report::notice`]) and list what failed.

mod analyzer;
mod cache;
mod cli;
mod config;
mod detector;
mod error;
mod license;
mod models;
mod registry;
mod report;
mod resolver;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use reqwest::Client;

use cache::ContentCache;
use cli::Cli;
use config::{load_config, Config};
use detector::detect_ecosystem;
use error::NoticeError;
use models::Ecosystem;
use registry::{crates_io::CratesIoProvider, nuget, pypi::PypiProvider, Providers};
use report::notice::write_output;
use report::terminal::{print_failures, ConsoleProgress};
use resolver::Resolver;

const USER_AGENT: &str = concat!(
    "thirdparty-notice/",
    env!("CARGO_PKG_VERSION"),
    " (third-party notice generator)"
);

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let Some(ecosystem) = detect_ecosystem(&cli.project) else {
        eprintln!(
            "{} {}",
            "error:".red().bold(),
            NoticeError::UnsupportedProject {
                path: cli.project.clone()
            }
        );
        std::process::exit(2);
    };

    let project_dir = if cli.project.is_dir() {
        cli.project.as_path()
    } else {
        cli.project
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    };
    let config = load_config(project_dir, cli.config.as_deref())?;

    let mut cache = ContentCache::open(&config.cache_config());
    if cli.clear_cache {
        cache.clear()?;
        log::info!("cleared {}", cache.dir().display());
    }
    if cli.no_cache {
        cache = cache.without_reads();
    }

    let dependencies = match analyzer::for_ecosystem(ecosystem).analyze(&cli.project) {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            std::process::exit(1);
        }
    };

    if !cli.quiet {
        eprintln!(
            "  {} {} {} dependencies",
            "→".cyan(),
            ecosystem,
            dependencies.len()
        );
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()?;

    let github_token = cli.github_token.clone().or_else(|| config.github.token.clone());
    let sources = license::default_chain(&client, github_token, cache.child("licenses"));
    let resolver = Resolver::new(cache, providers(ecosystem, &client, &config), sources);

    let progress = ConsoleProgress::new(dependencies.len(), cli.quiet);
    let batch = resolver.resolve(&dependencies, &progress).await;
    progress.finish();

    let header = config.output.header && !cli.no_header;
    write_output(cli.output.as_deref(), &batch.notice, header)?;

    print_failures(&batch.failed_ids());

    Ok(())
}

/// Metadata provider for the ecosystem being processed.
fn providers(ecosystem: Ecosystem, client: &Client, config: &Config) -> Providers {
    let mut providers = Providers::new();
    match ecosystem {
        Ecosystem::Cargo => {
            providers.insert(ecosystem, Box::new(CratesIoProvider::new(client.clone())));
        }
        Ecosystem::PyPI => {
            providers.insert(ecosystem, Box::new(PypiProvider::new(client.clone())));
        }
        Ecosystem::NuGet => {
            let root = nuget::global_packages_dir(config.nuget.global_packages.as_deref())
                .or_else(|| dirs::home_dir().map(|h| h.join(".nuget").join("packages")))
                .unwrap_or_default();
            log::debug!("NuGet global packages: {}", root.display());
            providers.insert(ecosystem, Box::new(nuget::NugetProvider::new(root)));
        }
    }
    providers
}
