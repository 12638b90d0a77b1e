use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::sheaf::tools::concat::{DocumentSource, concatenate};
use crate::sheaf::tools::config::{BatchOptions, FailurePolicy};
use crate::sheaf::tools::convert::{Converter, TemporaryArtifact, display_name};
use crate::sheaf::tools::error::{MergeError, Result};

const PDF_EXTENSIONS: [&str; 1] = ["pdf"];
const WORD_EXTENSIONS: [&str; 2] = ["docx", "doc"];

/// Outcome of one input of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Merged { pages: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub name: String,
    pub status: EntryStatus,
}

/// Summary of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub run_id: Uuid,
    /// The scanned directory did not exist and was created; nothing was merged.
    pub directory_created: bool,
    pub entries: Vec<BatchEntry>,
    pub output: Option<PathBuf>,
    pub page_count: usize,
}

impl BatchReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            directory_created: false,
            entries: Vec::new(),
            output: None,
            page_count: 0,
        }
    }

    pub fn merged(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.status, EntryStatus::Merged { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.status, EntryStatus::Skipped { .. }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Pdf,
    WordProcessor,
}

/// Merges every PDF and word-processor document found in `dir` into one PDF
/// written back into `dir` as `options.output_name`.
///
/// Inputs are merged in file-name order and the output file itself is never
/// picked up as an input. Word-processor files are converted into a scratch
/// directory owned by this run; the converted files are removed when the run
/// ends, whether it succeeds or fails. When `dir` does not exist it is created
/// and the run ends without merging. An output name carrying any directory
/// component is rejected before the directory is touched.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), output = %options.output_name))]
pub fn run_batch(dir: &Path, options: &BatchOptions, converter: &dyn Converter) -> Result<BatchReport> {
    ensure_plain_file_name(&options.output_name)?;
    let mut report = BatchReport::new();
    info!(run_id = %report.run_id, "batch run started");

    if !dir.exists() {
        fs::create_dir_all(dir)?;
        info!("created input directory; add documents and run again");
        report.directory_created = true;
        return Ok(report);
    }

    let inputs = scan_inputs(dir, &options.output_name)?;
    info!(inputs = inputs.len(), "inputs found");

    // Declared before any conversion so artifacts are released on every exit path.
    let scratch = TempDir::new()?;
    let mut artifacts: Vec<TemporaryArtifact> = Vec::new();
    let mut sources = Vec::with_capacity(inputs.len());

    for (path, kind) in &inputs {
        let name = display_name(path);
        let loaded = match kind {
            InputKind::Pdf => fs::read(path).map_err(MergeError::from),
            InputKind::WordProcessor => converter.convert(path, scratch.path()).and_then(|pdf| {
                let artifact = TemporaryArtifact::new(pdf);
                let bytes = fs::read(artifact.path()).map_err(|err| MergeError::Conversion {
                    name: name.clone(),
                    reason: format!("converted PDF unreadable: {err}"),
                });
                artifacts.push(artifact);
                bytes
            }),
        };

        match loaded {
            Ok(bytes) => sources.push(DocumentSource::new(name, bytes)),
            Err(err) if options.failure_policy == FailurePolicy::SkipFailed && err.is_skippable() => {
                warn!(input = %name, status = "skipped", error = %err, "input left out");
                report.entries.push(BatchEntry {
                    name,
                    status: EntryStatus::Skipped {
                        reason: err.to_string(),
                    },
                });
            }
            Err(err) => return Err(err),
        }
    }

    let outcome = concatenate(&sources, &options.concat_options(), |progress| {
        info!(
            completed = progress.completed,
            total = progress.total,
            "merge progress {:.0}%",
            progress.fraction() * 100.0
        );
    })?;

    for merged in outcome.merged {
        info!(input = %merged.name, status = "merged", pages = merged.pages, "input merged");
        report.entries.push(BatchEntry {
            name: merged.name,
            status: EntryStatus::Merged {
                pages: merged.pages,
            },
        });
    }
    for skipped in outcome.skipped {
        report.entries.push(BatchEntry {
            name: skipped.name,
            status: EntryStatus::Skipped {
                reason: skipped.reason,
            },
        });
    }
    report.entries.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));

    let output_path = dir.join(&options.output_name);
    fs::write(&output_path, &outcome.bytes)?;
    info!(
        output = %output_path.display(),
        pages = outcome.page_count,
        "merged document written"
    );

    report.page_count = outcome.page_count;
    report.output = Some(output_path);
    Ok(report)
}

fn ensure_plain_file_name(name: &str) -> Result<()> {
    if Path::new(name).file_name() == Some(OsStr::new(name)) {
        Ok(())
    } else {
        Err(MergeError::InvalidOutputName(name.to_string()))
    }
}

/// Lists mergeable files of `dir` sorted by file name, leaving out the
/// output file.
fn scan_inputs(dir: &Path, output_name: &str) -> Result<Vec<(PathBuf, InputKind)>> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.file_name().is_some_and(|name| name == output_name) {
            continue;
        }
        if let Some(kind) = classify(&path) {
            inputs.push((path, kind));
        }
    }
    inputs.sort_by(|(lhs, _), (rhs, _)| lhs.file_name().cmp(&rhs.file_name()));
    Ok(inputs)
}

fn classify(path: &Path) -> Option<InputKind> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    if PDF_EXTENSIONS.contains(&extension.as_str()) {
        Some(InputKind::Pdf)
    } else if WORD_EXTENSIONS.contains(&extension.as_str()) {
        Some(InputKind::WordProcessor)
    } else {
        None
    }
}
