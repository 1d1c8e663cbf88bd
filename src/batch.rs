//! Directory batch drivers.
//!
//! The basic pass turns every source image in a directory into a sibling PNG,
//! skipping sources whose PNG already exists. The reprocess pass runs the
//! aggressive remover over existing PNGs and swaps each result into place
//! through a temporary file. Files are handled one at a time; a failure is
//! recorded against its file and the run continues.

use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{self, AggressiveOptions, BasicOptions, Remover, Trimmed};
use crate::error::{Error, Result};

/// Default card image directory, relative to the working directory.
pub const DEFAULT_CARD_DIR: &str = "public/card_image";

/// File extensions used by the batch passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Extension of the scans consumed by the basic pass.
    pub source_extension: String,
    /// Extension of the transparent outputs.
    pub target_extension: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            source_extension: "jpg".to_string(),
            target_extension: "png".to_string(),
        }
    }
}

/// What happened to a single file.
#[derive(Debug)]
pub enum FileStatus {
    /// Processed and written.
    Processed(Trimmed),
    /// Output already existed.
    Skipped,
    /// Processing or replacement failed.
    Failed(Error),
}

/// Outcome for one file in a batch.
#[derive(Debug)]
pub struct FileOutcome {
    /// The input file.
    pub path: PathBuf,
    /// What happened to it.
    pub status: FileStatus,
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug)]
pub enum Progress<'a> {
    /// The matching files were enumerated.
    Found {
        /// Number of files that will be visited.
        count: usize,
    },
    /// Basic processing of a file is starting.
    Processing(&'a Path),
    /// Aggressive reprocessing of a file is starting.
    Reprocessing(&'a Path),
    /// A file was skipped because its output exists.
    Skipping(&'a Path),
    /// A file finished successfully.
    Saved {
        /// Written output.
        output: &'a Path,
        /// Dimensions before and after.
        trimmed: Trimmed,
    },
    /// A file failed.
    Failed {
        /// The input file.
        path: &'a Path,
        /// Why.
        error: &'a Error,
    },
}

/// Counts accumulated over one batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Files processed successfully.
    pub processed: usize,
    /// Files skipped because their output existed.
    pub skipped: usize,
    /// Files that failed.
    pub failed: usize,
    /// Per-file outcomes in processing order.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
    /// Number of files visited.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    fn record(&mut self, path: PathBuf, status: FileStatus) {
        match status {
            FileStatus::Processed(_) => self.processed += 1,
            FileStatus::Skipped => self.skipped += 1,
            FileStatus::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(FileOutcome { path, status });
    }
}

/// Counts from deleting original scans.
#[derive(Debug, Default)]
pub struct DeleteSummary {
    /// Originals removed.
    pub deleted: Vec<PathBuf>,
    /// Originals that could not be removed, with the error.
    pub failed: Vec<(PathBuf, std::io::Error)>,
}

/// List files in `dir` with extension `ext`, sorted by name.
///
/// # Errors
///
/// Returns [`Error::MissingDirectory`] if `dir` is not a directory,
/// [`Error::NoMatchingFiles`] if nothing matches, or [`Error::Io`] if the
/// directory cannot be read.
pub fn collect_files(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingDirectory(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| engine::has_extension(p, ext))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(Error::NoMatchingFiles {
            dir: dir.to_path_buf(),
            extension: ext.to_string(),
        });
    }
    Ok(files)
}

/// Run the basic remover over every source image in `dir`.
///
/// Sources whose output already exists are skipped, so repeated runs leave
/// existing outputs untouched.
///
/// # Errors
///
/// Returns a configuration error if the directory is missing or holds no
/// source images. Per-file failures are recorded in the summary instead.
pub fn run_basic_pass<F>(
    dir: &Path,
    opts: &BasicOptions,
    batch: &BatchOptions,
    mut on_progress: F,
) -> Result<BatchSummary>
where
    F: FnMut(Progress<'_>),
{
    let files = collect_files(dir, &batch.source_extension)?;
    on_progress(Progress::Found { count: files.len() });

    let remover = Remover::Basic(*opts);
    let mut summary = BatchSummary::default();

    for input in files {
        let output = engine::output_path_for(&input, &batch.target_extension);

        if output.exists() {
            on_progress(Progress::Skipping(&input));
            summary.record(input, FileStatus::Skipped);
            continue;
        }

        on_progress(Progress::Processing(&input));
        let status = match engine::process_file(&input, &output, &remover) {
            Ok(trimmed) => {
                on_progress(Progress::Saved {
                    output: &output,
                    trimmed,
                });
                FileStatus::Processed(trimmed)
            }
            Err(error) => {
                log::warn!("failed to process {}: {error}", input.display());
                on_progress(Progress::Failed {
                    path: &input,
                    error: &error,
                });
                FileStatus::Failed(error)
            }
        };
        summary.record(input, status);
    }

    Ok(summary)
}

/// Run the aggressive remover over every output image in `dir`, in place.
///
/// Each file is written to a `*.tmp.<ext>` sibling first and only moved over
/// the original once that succeeds. Leftover temporaries from an interrupted
/// run are not picked up as inputs.
///
/// # Errors
///
/// Returns a configuration error if the directory is missing, holds no
/// images, or `opts` is invalid. Per-file failures are recorded in the summary.
pub fn run_aggressive_pass<F>(
    dir: &Path,
    opts: &AggressiveOptions,
    batch: &BatchOptions,
    mut on_progress: F,
) -> Result<BatchSummary>
where
    F: FnMut(Progress<'_>),
{
    opts.validate()?;

    let (temps, files): (Vec<_>, Vec<_>) = collect_files(dir, &batch.target_extension)?
        .into_iter()
        .partition(|p| engine::is_temp_file(p));
    for temp in &temps {
        log::warn!("ignoring leftover temporary file {}", temp.display());
    }
    if files.is_empty() {
        return Err(Error::NoMatchingFiles {
            dir: dir.to_path_buf(),
            extension: batch.target_extension.clone(),
        });
    }
    on_progress(Progress::Found { count: files.len() });

    let remover = Remover::Aggressive(*opts);
    let mut summary = BatchSummary::default();

    for path in files {
        on_progress(Progress::Reprocessing(&path));
        let status = match reprocess_in_place(&path, &remover) {
            Ok(trimmed) => {
                on_progress(Progress::Saved {
                    output: &path,
                    trimmed,
                });
                FileStatus::Processed(trimmed)
            }
            Err(error) => {
                log::warn!("failed to reprocess {}: {error}", path.display());
                on_progress(Progress::Failed {
                    path: &path,
                    error: &error,
                });
                FileStatus::Failed(error)
            }
        };
        summary.record(path, status);
    }

    Ok(summary)
}

/// Process `path` into a temporary sibling, then move it over `path`.
///
/// # Errors
///
/// Returns the processing error, or [`Error::Replace`] if the swap fails. The
/// temporary file never outlives a failure.
pub fn reprocess_in_place(path: &Path, remover: &Remover) -> Result<Trimmed> {
    let temp = engine::temp_path_for(path);

    let trimmed = match engine::process_file(path, &temp, remover) {
        Ok(trimmed) => trimmed,
        Err(e) => {
            remove_temp(&temp);
            return Err(e);
        }
    };

    swap_into_place(&temp, path)?;
    Ok(trimmed)
}

/// Move a finished temporary file over `target`.
///
/// # Errors
///
/// Returns [`Error::Replace`] if the temporary file is missing or empty, or
/// the rename fails. The temporary file is removed in that case.
pub fn swap_into_place(temp: &Path, target: &Path) -> Result<()> {
    replace_with(temp, target).map_err(|source| {
        remove_temp(temp);
        Error::Replace {
            path: target.to_path_buf(),
            source,
        }
    })
}

fn replace_with(temp: &Path, target: &Path) -> std::io::Result<()> {
    let written = fs::metadata(temp)?;
    if !written.is_file() || written.len() == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} is empty", temp.display()),
        ));
    }
    fs::rename(temp, target)
}

fn remove_temp(temp: &Path) {
    if temp.exists() {
        if let Err(e) = fs::remove_file(temp) {
            log::warn!("failed to remove temporary file {}: {e}", temp.display());
        }
    }
}

/// Delete source images whose output now exists.
///
/// Sources without an output on disk are left alone. Each failure is recorded
/// and the remaining files are still attempted.
#[must_use]
pub fn delete_originals(sources: &[PathBuf], batch: &BatchOptions) -> DeleteSummary {
    let mut summary = DeleteSummary::default();
    for source in sources {
        if !engine::output_path_for(source, &batch.target_extension).exists() {
            continue;
        }
        match fs::remove_file(source) {
            Ok(()) => summary.deleted.push(source.clone()),
            Err(e) => {
                log::warn!("failed to delete {}: {e}", source.display());
                summary.failed.push((source.clone(), e));
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.JPG", "c.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();

        let files = collect_files(dir.path(), "jpg").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.JPG", "b.jpg"]);
    }

    #[test]
    fn collect_files_reports_configuration_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            collect_files(dir.path(), "jpg"),
            Err(Error::NoMatchingFiles { .. })
        ));
        assert!(matches!(
            collect_files(&dir.path().join("missing"), "jpg"),
            Err(Error::MissingDirectory(_))
        ));
    }

    #[test]
    fn delete_only_removes_sources_with_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let done = dir.path().join("done.jpg");
        let pending = dir.path().join("pending.jpg");
        fs::write(&done, b"x").unwrap();
        fs::write(dir.path().join("done.png"), b"x").unwrap();
        fs::write(&pending, b"x").unwrap();

        let summary = delete_originals(&[done.clone(), pending.clone()], &BatchOptions::default());
        assert_eq!(summary.deleted, vec![done.clone()]);
        assert!(summary.failed.is_empty());
        assert!(!done.exists());
        assert!(pending.exists());
    }

    #[test]
    fn delete_failure_is_recorded_and_later_sources_still_deleted() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be removed with remove_file
        let stuck = dir.path().join("a.jpg");
        fs::create_dir(&stuck).unwrap();
        fs::write(dir.path().join("a.png"), b"x").unwrap();
        let later = dir.path().join("b.jpg");
        fs::write(&later, b"x").unwrap();
        fs::write(dir.path().join("b.png"), b"x").unwrap();

        let summary = delete_originals(&[stuck.clone(), later.clone()], &BatchOptions::default());
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, stuck);
        assert_eq!(summary.deleted, vec![later.clone()]);
        assert!(stuck.exists());
        assert!(!later.exists());
    }

    #[test]
    fn failed_swap_reports_replace_and_removes_temp() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("card.tmp.png");
        fs::write(&temp, b"processed").unwrap();
        // renaming a file over a non-empty directory fails
        let target = dir.path().join("card.png");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        let err = swap_into_place(&temp, &target).unwrap_err();
        assert!(matches!(err, Error::Replace { ref path, .. } if *path == target));
        assert!(!temp.exists());
        assert!(target.join("keep").exists());

        let mut summary = BatchSummary::default();
        summary.record(target, FileStatus::Failed(err));
        assert_eq!((summary.processed, summary.failed), (0, 1));
    }

    #[test]
    fn empty_temp_is_not_swapped_in() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("card.tmp.png");
        let target = dir.path().join("card.png");
        fs::write(&temp, b"").unwrap();
        fs::write(&target, b"original").unwrap();

        assert!(matches!(
            swap_into_place(&temp, &target),
            Err(Error::Replace { .. })
        ));
        assert!(!temp.exists());
        assert_eq!(fs::read(&target).unwrap(), b"original");
    }

    #[test]
    fn swap_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("card.tmp.png");
        let target = dir.path().join("card.png");
        fs::write(&temp, b"new").unwrap();
        fs::write(&target, b"old").unwrap();

        swap_into_place(&temp, &target).unwrap();
        assert!(!temp.exists());
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn failed_reprocess_leaves_original_and_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not a png").unwrap();

        let remover = Remover::Aggressive(AggressiveOptions::default());
        let err = reprocess_in_place(&path, &remover).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"not a png");
        assert!(!engine::temp_path_for(&path).exists());
    }
}
