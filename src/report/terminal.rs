use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::models::Dependency;
use crate::resolver::{Outcome, Progress};

/// Per-dependency status lines above a progress bar, on stderr.
pub struct ConsoleProgress {
    pb: Option<ProgressBar>,
}

impl ConsoleProgress {
    /// With `quiet`, nothing is drawn.
    pub fn new(total: usize, quiet: bool) -> Self {
        if quiet {
            return Self { pb: None };
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Self { pb: Some(pb) }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}

impl Progress for ConsoleProgress {
    fn started(&self, dependency: &Dependency) {
        if let Some(pb) = &self.pb {
            pb.set_message(dependency.id());
        }
    }

    fn finished(&self, dependency: &Dependency, outcome: Outcome<'_>) {
        let Some(pb) = &self.pb else {
            return;
        };

        let line = status_line(dependency, outcome);
        // indicatif draws nothing when stderr is not a terminal, so the
        // status lines go out directly there.
        if pb.is_hidden() {
            eprintln!("{line}");
        } else {
            pb.println(line);
        }
        pb.inc(1);
    }
}

/// One `✓`/`✗` line for a finished dependency.
fn status_line(dependency: &Dependency, outcome: Outcome<'_>) -> String {
    match outcome {
        Outcome::CacheHit => format!(
            "  {} {} {}",
            "✓".green(),
            dependency.id(),
            "[cache]".cyan()
        ),
        Outcome::Resolved(provenance) => format!(
            "  {} {} {}",
            "✓".green(),
            dependency.id(),
            format!("[{provenance}]").dimmed()
        ),
        Outcome::Failed(reason) => format!(
            "  {} {} {}",
            "✗".red(),
            dependency.id(),
            reason.to_string().red()
        ),
    }
}

/// Print the unresolved packages under a fixed banner on stderr.
pub fn print_failures(ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    eprintln!();
    eprintln!(
        "{}",
        "Failed to get information for the following packages:"
            .red()
            .bold()
    );
    for id in ids {
        eprintln!("{id}");
    }
}
