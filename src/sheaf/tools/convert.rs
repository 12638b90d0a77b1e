use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, instrument, warn};

use crate::sheaf::tools::config::DEFAULT_CONVERTER_PROGRAM;
use crate::sheaf::tools::error::{MergeError, Result};

/// Turns one word-processor document into a PDF.
pub trait Converter {
    /// Converts `source` and returns the path of the PDF written under
    /// `out_dir`.
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf>;
}

impl<F> Converter for F
where
    F: Fn(&Path, &Path) -> Result<PathBuf>,
{
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf> {
        self(source, out_dir)
    }
}

/// Converts documents by running a headless office suite
/// (`soffice --headless --convert-to pdf`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SofficeConverter {
    program: PathBuf,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER_PROGRAM)
    }
}

impl SofficeConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Converter for SofficeConverter {
    #[instrument(level = "debug", skip_all, fields(source = %source.display()))]
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf> {
        let name = display_name(source);
        let conversion_error = |reason: String| MergeError::Conversion {
            name: name.clone(),
            reason,
        };

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(source)
            .output()
            .map_err(|err| {
                conversion_error(format!(
                    "cannot run '{}': {err}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(conversion_error(format!(
                "{} ({})",
                output.status,
                stderr.trim()
            )));
        }

        let stem = source
            .file_stem()
            .ok_or_else(|| conversion_error("input has no file name".to_string()))?;
        let mut pdf_path = out_dir.join(stem);
        pdf_path.set_extension("pdf");
        if !pdf_path.exists() {
            return Err(conversion_error(format!(
                "converted PDF not found at {}",
                pdf_path.display()
            )));
        }

        debug!(output = %pdf_path.display(), "document converted");
        Ok(pdf_path)
    }
}

/// A conversion byproduct removed when dropped.
///
/// Removal is best effort: a file that is already gone or still locked is
/// logged as a warning and otherwise ignored.
#[derive(Debug)]
pub struct TemporaryArtifact {
    path: PathBuf,
}

impl TemporaryArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TemporaryArtifact {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "temporary artifact removed"),
            Err(err) => warn!(
                path = %self.path.display(),
                error = %err,
                "could not remove temporary artifact"
            ),
        }
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
