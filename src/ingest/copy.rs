//! Per-file copy decisions and the atomic write.
//!
//! Each [`FileRecord`] ends in exactly one of three states:
//!
//! | Check | Result |
//! |-------|--------|
//! | content already indexed under the output root, policy `No`, not forced | Skipped (duplicate content) |
//! | source cannot be opened, directory cannot be created, write fails | Errored |
//! | a file with the sanitised name exists, policy `No` | Skipped (destination exists) |
//! | ... policy `Ask` and the prompt declines | Skipped (declined) |
//! | otherwise | Copied, then recorded in the resume log |
//!
//! Writes go through a temp file in the destination directory and an atomic
//! rename, so an interrupted copy never leaves a partial file under the final
//! name and never reaches the resume log.

use super::utils::{apply_source_mtime, copy_file_contents, destination_dir, sanitize_file_name};
use crate::error::{Error, Result};
use crate::options::{IngestOptions, Overwrite};
use crate::pipeline::{Outcome, Progress};
use crate::record::{CopiedFile, ErrorRecord, FileRecord, SkipReason, SkippedFile};
use crate::resume::ResumeLog;
use crate::store::{ContentStore, Namespace};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) type CopyOutcome = Outcome<CopiedFile, SkippedFile, ErrorRecord>;

/// Copies resolved records into the output tree.
///
/// Shared by reference across the copy workers.
#[derive(Debug)]
pub(crate) struct Copier<'a> {
    store: &'a ContentStore,
    options: &'a IngestOptions,
    resume: &'a ResumeLog,
    root: &'a Path,
    // One overwrite prompt at a time
    prompt: Mutex<()>,
    warned_no_prompt: AtomicBool,
}

/// What to do about an existing destination file.
enum Conflict {
    None,
    Replace,
    Keep(SkipReason),
}

impl<'a> Copier<'a> {
    pub(crate) fn new(
        store: &'a ContentStore,
        options: &'a IngestOptions,
        resume: &'a ResumeLog,
        root: &'a Path,
    ) -> Self {
        Self {
            store,
            options,
            resume,
            root,
            prompt: Mutex::new(()),
            warned_no_prompt: AtomicBool::new(false),
        }
    }

    /// Run one record through the copy state machine.
    pub(crate) fn copy(&self, record: &FileRecord, progress: &Progress) -> CopyOutcome {
        match self.try_copy(record, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(path = %record.path.display(), "copy failed: {e}");
                Outcome::Failed(ErrorRecord {
                    path: record.path.clone(),
                    timestamp: record.timestamp,
                    message: e.to_string(),
                })
            }
        }
    }

    fn try_copy(&self, record: &FileRecord, progress: &Progress) -> Result<CopyOutcome> {
        if !self.options.force_copy && self.options.overwrite == Overwrite::No {
            if let Some(existing) = self.store.get(Namespace::Dst, &record.fingerprint)? {
                self.options.verbose(&format!(
                    "{}: same content already at {}",
                    record.path.display(),
                    existing.display()
                ));
                return Ok(Outcome::Skipped(SkippedFile {
                    source: record.path.clone(),
                    destination: Some(existing),
                    reason: SkipReason::DuplicateContent,
                }));
            }
        }

        progress.file("Copying", &record.path);

        let src_file = File::open(&record.path)?;
        let src_meta = src_file.metadata()?;
        if src_meta.is_dir() {
            return Err(Error::IsADirectory(record.path.clone()));
        }

        let dir = destination_dir(self.root, &record.timestamp, self.options.date_layout);
        fs::create_dir_all(&dir).map_err(|e| Error::CreateDir {
            path: dir.clone(),
            source: e,
        })?;
        let dst = dir.join(sanitize_file_name(record.name()));

        let replace = match self.conflict(&dst)? {
            Conflict::Keep(reason) => {
                return Ok(Outcome::Skipped(skipped(record, dst, reason)));
            }
            Conflict::Replace => true,
            Conflict::None => false,
        };

        let temp_file = tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::TempFile {
            path: dir.clone(),
            source: e,
        })?;

        let bytes = copy_file_contents(&src_file, temp_file.as_file(), src_meta.len())?;

        if self.options.fsync {
            temp_file.as_file().sync_all()?;
        }
        fs::set_permissions(temp_file.path(), src_meta.permissions())?;

        // Replace mode: persist() also clobbers a file created since the check.
        // Otherwise persist_noclobber() catches the race and the copy is skipped.
        if replace {
            temp_file.persist(&dst).map_err(|e| Error::Persist {
                path: dst.clone(),
                source: e.error,
            })?;
        } else if let Err(e) = temp_file.persist_noclobber(&dst) {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                return Ok(Outcome::Skipped(skipped(
                    record,
                    dst,
                    SkipReason::DestinationExists,
                )));
            }
            return Err(Error::Persist {
                path: dst,
                source: e.error,
            });
        }

        if let Err(e) = apply_source_mtime(&src_meta, &dst) {
            self.options
                .warn(&format!("Failed to set times on {}: {e}", dst.display()));
        }

        if let Err(e) = self.resume.record(&record.path) {
            self.options.warn(&format!(
                "Failed to record {} in {}: {e}",
                record.path.display(),
                self.resume.path().display()
            ));
        }

        tracing::debug!(
            src = %record.path.display(),
            dst = %dst.display(),
            bytes,
            "copied"
        );
        Ok(Outcome::Done(CopiedFile {
            source: record.path.clone(),
            destination: dst,
            timestamp: record.timestamp,
            bytes,
        }))
    }

    fn conflict(&self, dst: &Path) -> Result<Conflict> {
        match fs::symlink_metadata(dst) {
            Ok(meta) if meta.is_dir() => Err(Error::IsADirectory(dst.to_path_buf())),
            Ok(_) if self.options.force_copy => Ok(Conflict::Replace),
            Ok(_) => Ok(match self.options.overwrite {
                Overwrite::Yes => Conflict::Replace,
                Overwrite::No => Conflict::Keep(SkipReason::DestinationExists),
                Overwrite::Ask => self.ask(dst),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Conflict::None),
            Err(e) => Err(e.into()),
        }
    }

    fn ask(&self, dst: &Path) -> Conflict {
        let Some(handler) = self.options.prompt_handler else {
            if !self.warned_no_prompt.swap(true, Ordering::Relaxed) {
                self.options.warn(
                    "Overwrite policy is 'ask' but no prompt is available; keeping existing files",
                );
            }
            return Conflict::Keep(SkipReason::DestinationExists);
        };
        let _guard = self
            .prompt
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if handler(dst) {
            Conflict::Replace
        } else {
            Conflict::Keep(SkipReason::Declined)
        }
    }
}

fn skipped(record: &FileRecord, dst: PathBuf, reason: SkipReason) -> SkippedFile {
    tracing::debug!(src = %record.path.display(), dst = %dst.display(), reason = reason.as_str(), "skipped");
    SkippedFile {
        source: record.path.clone(),
        destination: Some(dst),
        reason,
    }
}
