//! Advisory external check command.
//!
//! The orchestrator can run an external checker (a type-checker, a linter)
//! before and after applying blocks and report how the error/warning counts
//! moved. The counts are a per-line substring approximation over the
//! command's combined output. Everything here is informational: a checker
//! that cannot be run degrades to "no check data" and never fails the run.

use tokio::process::Command;

/// Error/warning line counts from one checker invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub errors: usize,
    pub warnings: usize,
}

/// Runs `command` (split on whitespace) and counts output lines mentioning
/// errors or warnings. Returns `None` when the command is empty or cannot
/// be spawned. The child's output is fully drained before counting.
pub async fn run_check(command: &str) -> Option<CheckReport> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;

    let output = match Command::new(program).args(parts).output().await {
        Ok(output) => output,
        Err(err) => {
            log::warn!("check command '{command}' could not be run: {err}");
            return None;
        }
    };

    let combined = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    Some(count_diagnostics(&combined))
}

fn count_diagnostics(output: &str) -> CheckReport {
    let mut errors = 0;
    let mut warnings = 0;
    for line in output.lines() {
        let lower = line.to_lowercase();
        if lower.contains("error") {
            errors += 1;
        } else if lower.contains("warning") {
            warnings += 1;
        }
    }
    CheckReport { errors, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_error_and_warning_lines() {
        let output = "\
src/a.ts(3,1): error TS2304: Cannot find name 'foo'.
src/b.ts(9,5): warning unused variable
all good here
ERROR: something broke
";
        let report = count_diagnostics(output);
        assert_eq!(report, CheckReport { errors: 2, warnings: 1 });
    }

    #[test]
    fn a_line_is_counted_once_with_error_taking_precedence() {
        let report = count_diagnostics("error after a warning on the same line\n");
        assert_eq!(report, CheckReport { errors: 1, warnings: 0 });
    }

    #[tokio::test]
    async fn unavailable_command_degrades_to_none() {
        assert!(run_check("definitely-not-a-real-binary-xyz").await.is_none());
        assert!(run_check("").await.is_none());
    }
}
