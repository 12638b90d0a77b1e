use tracing::{info, instrument, warn};

use crate::sheaf::tools::config::{ConcatOptions, FailurePolicy};
use crate::sheaf::tools::error::Result;
use crate::sheaf::tools::io::pdf::PdfAccumulator;

/// A named PDF held in memory. The name is only used for logs and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DocumentSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Completion reported after each input has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completed share of the run, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// An input whose pages made it into the merged document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedInput {
    pub name: String,
    pub pages: usize,
}

/// An input left out of the merged document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInput {
    pub name: String,
    pub reason: String,
}

/// Result of a successful concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatOutcome {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Inputs whose pages made it into the output, in merge order.
    pub merged: Vec<MergedInput>,
    pub skipped: Vec<SkippedInput>,
}

/// Concatenates the pages of `sources` in the order given.
///
/// Under [`FailurePolicy::Abort`] the first unreadable input fails the whole
/// run. Under [`FailurePolicy::SkipFailed`] unreadable inputs are recorded in
/// [`ConcatOutcome::skipped`] and the rest are still merged. Either way the run
/// fails when no page remains to be written. `progress` is called once per
/// input and has no influence on the result.
#[instrument(
    level = "info",
    skip_all,
    fields(inputs = sources.len(), policy = ?options.failure_policy)
)]
pub fn concatenate<F>(
    sources: &[DocumentSource],
    options: &ConcatOptions,
    mut progress: F,
) -> Result<ConcatOutcome>
where
    F: FnMut(Progress),
{
    let mut accumulator = PdfAccumulator::new().with_compression(options.compress);
    let mut merged = Vec::with_capacity(sources.len());
    let mut skipped = Vec::new();
    let total = sources.len();

    for (index, source) in sources.iter().enumerate() {
        match accumulator.append(&source.name, &source.bytes) {
            Ok(pages) => {
                info!(input = %source.name, pages, "document appended");
                merged.push(MergedInput {
                    name: source.name.clone(),
                    pages,
                });
            }
            Err(err) if options.failure_policy == FailurePolicy::SkipFailed && err.is_skippable() => {
                warn!(input = %source.name, status = "skipped", error = %err, "skipping unreadable document");
                skipped.push(SkippedInput {
                    name: source.name.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
        progress(Progress {
            completed: index + 1,
            total,
        });
    }

    let page_count = accumulator.page_count();
    let bytes = accumulator.finish()?;
    info!(
        pages = page_count,
        merged = merged.len(),
        skipped = skipped.len(),
        "documents concatenated"
    );

    Ok(ConcatOutcome {
        bytes,
        page_count,
        merged,
        skipped,
    })
}
