//! The write/revert transaction.
//!
//! Applying a batch of code blocks is a three-phase affair: capture the
//! pre-write state of every target path, write all blocks, and — if the
//! operator declines the result — revert using only the captured state.
//! Per-file work is independent, so capture, write, and revert each fan out
//! as one task per file and join before the next phase.

use crate::analyzer::CodeBlock;
use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::task::JoinSet;

/// Pre-write snapshot for one target path, captured before any write in the
/// batch begins. `original_content` is `None` both when the file did not
/// exist and when it existed but could not be read; `originally_existed`
/// tells the two apart.
#[derive(Debug, Clone)]
pub struct WriteOperation {
    pub block: CodeBlock,
    pub original_content: Option<String>,
    pub originally_existed: bool,
}

/// Outcome of one attempted write. The line counts are a coarse
/// approximation against the prior content, not a diff.
#[derive(Debug)]
pub struct WriteResult {
    pub file_path: String,
    pub success: bool,
    pub error: Option<anyhow::Error>,
    pub lines_added: usize,
    pub lines_deleted: usize,
}

/// Aggregate counts folded over a batch of [`WriteResult`]s.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingStats {
    pub total_attempted: usize,
    pub successful_writes: usize,
    pub failed_writes: usize,
    pub total_lines_added: usize,
    pub total_lines_deleted: usize,
    pub duration_ms: f64,
}

/// The full transaction record. `original_states` is retained so a later
/// revert can run without re-reading a filesystem that has since changed.
#[derive(Debug)]
pub struct ApplyResult {
    pub write_results: Vec<WriteResult>,
    pub original_states: Vec<WriteOperation>,
    pub stats: ProcessingStats,
}

/// Captures the pre-write state of every block's target path. All captures
/// complete before the caller starts writing, so revert has a consistent
/// "before" view across the whole batch. Results are in block order.
pub async fn capture_original_states(blocks: &[CodeBlock]) -> Vec<WriteOperation> {
    let mut tasks = JoinSet::new();
    for (index, block) in blocks.iter().cloned().enumerate() {
        tasks.spawn(async move { (index, capture_one(block).await) });
    }

    let mut slots: Vec<Option<WriteOperation>> = blocks.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        if let Ok((index, op)) = joined {
            slots[index] = Some(op);
        }
    }
    slots.into_iter().flatten().collect()
}

async fn capture_one(block: CodeBlock) -> WriteOperation {
    let exists = tokio::fs::try_exists(&block.file_path).await.unwrap_or(false);
    if !exists {
        return WriteOperation {
            block,
            original_content: None,
            originally_existed: false,
        };
    }

    let original_content = match tokio::fs::read_to_string(&block.file_path).await {
        Ok(text) => Some(text),
        Err(err) => {
            log::warn!(
                "could not capture original content of {}: {err}",
                block.file_path
            );
            None
        }
    };
    WriteOperation {
        block,
        original_content,
        originally_existed: true,
    }
}

/// Writes one block to its target path, creating parent directories as
/// needed. Every failure is caught into the result; a failing block never
/// aborts the rest of the batch.
pub async fn write_block(block: &CodeBlock) -> WriteResult {
    match perform_write(block).await {
        Ok((lines_added, lines_deleted)) => WriteResult {
            file_path: block.file_path.clone(),
            success: true,
            error: None,
            lines_added,
            lines_deleted,
        },
        Err(err) => {
            log::error!("error writing file {}: {err:#}", block.file_path);
            WriteResult {
                file_path: block.file_path.clone(),
                success: false,
                error: Some(err),
                lines_added: 0,
                lines_deleted: 0,
            }
        }
    }
}

async fn perform_write(block: &CodeBlock) -> Result<(usize, usize)> {
    ensure_parent_dir(Path::new(&block.file_path)).await?;

    // Prior content is read only to compute the line delta. A missing file
    // counts as empty; any other read failure fails the operation.
    let old_lines = match tokio::fs::read_to_string(&block.file_path).await {
        Ok(text) => text.lines().count(),
        Err(err) if err.kind() == ErrorKind::NotFound => 0,
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read existing file {}", block.file_path));
        }
    };

    tokio::fs::write(&block.file_path, &block.file_content)
        .await
        .with_context(|| format!("failed to write {}", block.file_path))?;

    let new_lines = block.file_content.lines().count();
    Ok((
        new_lines.saturating_sub(old_lines),
        old_lines.saturating_sub(new_lines),
    ))
}

async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Path::new(".") || parent == Path::new("/") {
        return Ok(());
    }
    tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("failed to create directory {}", parent.display()))
}

/// Applies the whole batch: captures original states first, then writes all
/// blocks concurrently, then folds the outcomes into [`ProcessingStats`].
/// Results are reported in block order regardless of completion order.
pub async fn write_all(blocks: &[CodeBlock]) -> ApplyResult {
    let started = Instant::now();
    let original_states = capture_original_states(blocks).await;

    let mut tasks = JoinSet::new();
    for (index, block) in blocks.iter().cloned().enumerate() {
        tasks.spawn(async move { (index, write_block(&block).await) });
    }

    let mut slots: Vec<Option<WriteResult>> = blocks.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        if let Ok((index, result)) = joined {
            slots[index] = Some(result);
        }
    }
    let write_results: Vec<WriteResult> = slots.into_iter().flatten().collect();

    let successful_writes = write_results.iter().filter(|r| r.success).count();
    let stats = ProcessingStats {
        total_attempted: write_results.len(),
        successful_writes,
        failed_writes: write_results.len() - successful_writes,
        total_lines_added: write_results.iter().map(|r| r.lines_added).sum(),
        total_lines_deleted: write_results.iter().map(|r| r.lines_deleted).sum(),
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
    };

    ApplyResult {
        write_results,
        original_states,
        stats,
    }
}

/// Undoes every successful write using the captured pre-write state, then
/// prunes directories this run created, deepest first, if they are empty.
///
/// Returns `true` iff every file reached a well-defined restored state. A
/// file that existed before the write but whose content could not be
/// captured is left in place (deleting it would be unrecoverable data loss)
/// and counts as a failure. Directory-cleanup problems are logged notes and
/// never flip the result.
pub async fn revert(write_results: &[WriteResult], original_states: &[WriteOperation]) -> bool {
    let mut tasks = JoinSet::new();
    for result in write_results.iter().filter(|r| r.success) {
        let snapshot = original_states
            .iter()
            .find(|op| op.block.file_path == result.file_path)
            .cloned();
        let file_path = result.file_path.clone();
        tasks.spawn(async move { revert_one(file_path, snapshot).await });
    }

    let mut all_restored = true;
    let mut dir_candidates: Vec<PathBuf> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((restored, mut created_dirs)) => {
                all_restored &= restored;
                dir_candidates.append(&mut created_dirs);
            }
            Err(err) => {
                log::error!("revert task failed: {err}");
                all_restored = false;
            }
        }
    }

    remove_empty_dirs(dir_candidates).await;
    all_restored
}

async fn revert_one(
    file_path: String,
    snapshot: Option<WriteOperation>,
) -> (bool, Vec<PathBuf>) {
    let Some(snapshot) = snapshot else {
        log::error!("no captured state for {file_path}; cannot revert it");
        return (false, Vec::new());
    };

    if snapshot.originally_existed {
        match &snapshot.original_content {
            Some(content) => match tokio::fs::write(&file_path, content).await {
                Ok(()) => {
                    log::info!("restored {file_path}");
                    (true, Vec::new())
                }
                Err(err) => {
                    log::error!("failed to restore {file_path}: {err}");
                    (false, Vec::new())
                }
            },
            None => {
                log::warn!(
                    "{file_path} existed before the write but its content was never captured; \
                     leaving the new content in place"
                );
                (false, Vec::new())
            }
        }
    } else {
        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => {
                log::info!("deleted {file_path}");
                (true, created_dir_candidates(Path::new(&file_path)))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => (true, Vec::new()),
            Err(err) => {
                log::error!("failed to delete {file_path}: {err}");
                (false, Vec::new())
            }
        }
    }
}

/// Every ancestor directory of `path`, nearest first, stopping before the
/// working root (empty path, `.`) or the filesystem root.
fn created_dir_candidates(path: &Path) -> Vec<PathBuf> {
    let Some(parent) = path.parent() else {
        return Vec::new();
    };
    parent
        .ancestors()
        .take_while(|dir| {
            !dir.as_os_str().is_empty() && *dir != Path::new(".") && *dir != Path::new("/")
        })
        .map(Path::to_path_buf)
        .collect()
}

async fn remove_empty_dirs(mut candidates: Vec<PathBuf>) {
    candidates.sort();
    candidates.dedup();
    // Deepest first, so an emptied child makes its parent removable.
    candidates.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));

    for dir in candidates {
        match dir_is_empty(&dir).await {
            Some(true) => match tokio::fs::remove_dir(&dir).await {
                Ok(()) => log::debug!("removed now-empty directory {}", dir.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => log::info!("left directory {} in place: {err}", dir.display()),
            },
            Some(false) => log::debug!("directory {} is not empty, keeping it", dir.display()),
            None => {}
        }
    }
}

/// `None` when the directory is already gone or unreadable.
async fn dir_is_empty(dir: &Path) -> Option<bool> {
    match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => match entries.next_entry().await {
            Ok(first) => Some(first.is_none()),
            Err(err) => {
                log::info!("could not inspect directory {}: {err}", dir.display());
                None
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => {
            log::info!("could not inspect directory {}: {err}", dir.display());
            None
        }
    }
}
