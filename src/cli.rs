use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "thirdparty-notice",
    about = "Generate a third-party notice file from a project's direct dependencies",
    version
)]
pub struct Cli {
    /// Project file (*.csproj, *.sln, pyproject.toml, Cargo.toml) or a Python project directory
    pub project: PathBuf,

    /// Write the notice here instead of stdout
    pub output: Option<PathBuf>,

    /// Config file [default: ./.thirdparty-notice/config.toml, fallback ~/.config/thirdparty-notice/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// GitHub token used for repository license lookups
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Ignore cached notices (fresh results are still cached)
    #[arg(long)]
    pub no_cache: bool,

    /// Delete the cache before running
    #[arg(long)]
    pub clear_cache: bool,

    /// Omit the header from the output file
    #[arg(long)]
    pub no_header: bool,

    /// Don't print per-dependency progress
    #[arg(short, long)]
    pub quiet: bool,
}
