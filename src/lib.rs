//! # mdapply Library
//!
//! This crate can be used to:
//!
//! - Extract fenced, path-annotated code blocks from a markdown document
//! - Apply them to the filesystem as real files, with a confirm/revert step
//!
//! ## Usage
//!
//! ### To apply code blocks from a markdown file:
//!
//! ```rust,no_run
//! use mdapply::{Config, StdinPrompter, run_apply};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config {
//!         input: Some(PathBuf::from("changes.md")),
//!         assume_yes: true,
//!         check_command: None,
//!     };
//!
//!     let status = run_apply(&config, &mut StdinPrompter).await?;
//!     println!("success: {}", status.is_success());
//!     Ok(())
//! }
//! ```
//!
//! ### To analyze markdown without touching the filesystem:
//!
//! ```rust
//! use mdapply::analyze;
//!
//! let result = analyze("```js // a.txt\nHELLO\n```");
//! assert_eq!(result.valid_blocks[0].file_path, "a.txt");
//! ```

pub mod analyzer;
pub mod apply;
pub mod check;
pub mod cli;
pub mod input;
pub mod report;

pub use analyzer::{AnalysisIssue, AnalysisResult, CodeBlock, analyze};
pub use apply::{ApplyResult, ProcessingStats, WriteOperation, WriteResult, revert, write_all};
pub use check::CheckReport;
pub use cli::Config;

use anyhow::{Context, Result};

/// How the run ended. Only `main` turns this into a process exit code; no
/// helper below the orchestrator terminates the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalStatus {
    /// Every block applied cleanly and the operator kept the changes.
    Applied,
    /// Nothing to do: the document contained no code blocks at all.
    NoChanges,
    /// The operator discarded the changes and the revert completed cleanly.
    Reverted,
    /// Changes were kept, but analysis issues or write failures remain.
    AppliedWithIssues,
    /// Analysis issues left nothing valid to apply.
    NothingApplied,
    /// The operator discarded the changes but the revert did not fully succeed.
    RevertFailed,
}

impl FinalStatus {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            FinalStatus::Applied | FinalStatus::NoChanges | FinalStatus::Reverted
        )
    }
}

/// Asks the operator a question and returns the raw response line. The
/// production implementation reads stdin; tests substitute their own.
pub trait Prompter {
    fn prompt(&mut self, message: &str) -> Result<String>;
}

/// Reads one line from standard input, echoing the prompt to stderr so it
/// does not mix with the report on stdout.
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt(&mut self, message: &str) -> Result<String> {
        use std::io::Write;

        eprint!("{message}");
        std::io::stderr().flush().ok();
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("failed to read confirmation from stdin")?;
        Ok(line)
    }
}

/// Only an explicit affirmative keeps the changes; anything else, including
/// empty input, reverts.
fn is_affirmative(response: &str) -> bool {
    let trimmed = response.trim();
    trimmed.eq_ignore_ascii_case("y") || trimmed.eq_ignore_ascii_case("yes")
}

/// The apply pipeline: optional pre-check, acquire input, analyze, write,
/// report, optional post-check comparison, confirm, optional revert.
///
/// Holds no parsing or revert logic itself, only sequencing and status
/// bookkeeping. Errors returned here are fatal (input acquisition and other
/// unexpected failures); everything recoverable is already folded into the
/// analysis result or the write outcomes.
pub async fn run_apply<P: Prompter>(config: &Config, prompter: &mut P) -> Result<FinalStatus> {
    let pre_check = match &config.check_command {
        Some(command) => {
            log::info!("running check before applying: {command}");
            check::run_check(command).await
        }
        None => None,
    };

    match &config.input {
        Some(path) => log::info!("reading markdown from file {}", path.display()),
        None => log::info!("reading markdown from clipboard"),
    }
    let markdown = input::acquire_input(config).await?;

    log::info!("analyzing markdown content");
    let analysis = analyzer::analyze(&markdown);

    if !analysis.issues.is_empty() {
        eprintln!("Analysis issues found:");
        for formatted in report::format_analysis_issues(&analysis.issues) {
            eprintln!("{formatted}");
        }
    }

    if analysis.valid_blocks.is_empty() {
        if analysis.issues.is_empty() {
            eprintln!("No code blocks found. Finished; no changes were applied or needed.");
            return Ok(FinalStatus::NoChanges);
        }
        eprintln!(
            "No valid code blocks were extracted. Finished with {} analysis issue(s).",
            analysis.issues.len()
        );
        return Ok(FinalStatus::NothingApplied);
    }

    if !analysis.issues.is_empty() {
        eprintln!(
            "Attempting to apply the {} valid code block(s) found...",
            analysis.valid_blocks.len()
        );
    } else {
        log::info!(
            "applying changes for {} valid code block(s)",
            analysis.valid_blocks.len()
        );
    }

    let outcome = apply::write_all(&analysis.valid_blocks).await;
    println!("{}", report::format_write_results(&outcome));

    if outcome.stats.successful_writes == 0 {
        eprintln!("Finished with write errors; nothing was applied.");
        return Ok(finish_kept(&analysis, &outcome));
    }

    if let Some(command) = &config.check_command {
        log::info!("running check after applying: {command}");
        let post_check = check::run_check(command).await;
        println!(
            "{}",
            report::format_check_outcome(pre_check.as_ref(), post_check.as_ref())
        );
    }

    let keep = if config.assume_yes {
        true
    } else {
        let response = prompter.prompt("Keep these changes? [y/N] ")?;
        is_affirmative(&response)
    };

    if keep {
        let status = finish_kept(&analysis, &outcome);
        if status == FinalStatus::Applied {
            eprintln!("Finished successfully.");
        } else if outcome.stats.failed_writes > 0 {
            eprintln!("Finished with write errors.");
        } else {
            eprintln!(
                "Finished with {} analysis issue(s).",
                analysis.issues.len()
            );
        }
        return Ok(status);
    }

    eprintln!("Reverting changes...");
    if apply::revert(&outcome.write_results, &outcome.original_states).await {
        println!("Changes reverted by user.");
        eprintln!("Finished successfully.");
        Ok(FinalStatus::Reverted)
    } else {
        println!("Revert finished with errors; some files may not have been restored.");
        Ok(FinalStatus::RevertFailed)
    }
}

fn finish_kept(analysis: &AnalysisResult, outcome: &ApplyResult) -> FinalStatus {
    if outcome.stats.failed_writes > 0 || !analysis.issues.is_empty() {
        FinalStatus::AppliedWithIssues
    } else {
        FinalStatus::Applied
    }
}
