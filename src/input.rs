//! Input acquisition: a named markdown file, or the system clipboard.

use crate::cli::Config;
use anyhow::{Context, Result, bail};

/// Reads the markdown document named by the config, falling back to the
/// system clipboard when no input file was given. A leading UTF-8 BOM is
/// stripped so a fence on the very first line is still recognized.
pub async fn acquire_input(config: &Config) -> Result<String> {
    let text = match &config.input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read input file {}", path.display()))?,
        None => read_clipboard()?,
    };
    Ok(strip_bom(text))
}

fn read_clipboard() -> Result<String> {
    let mut clipboard = arboard::Clipboard::new().context("clipboard is not available")?;
    let text = clipboard
        .get_text()
        .context("failed to read text from clipboard")?;
    if text.trim().is_empty() {
        bail!("clipboard is empty or contains only whitespace");
    }
    Ok(text)
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}
