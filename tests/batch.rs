mod common;

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use sheaf_tools::MergeError;
use sheaf_tools::batch::{EntryStatus, run_batch};
use sheaf_tools::config::{BatchOptions, FailurePolicy};
use tempfile::tempdir;

use common::{page_count, page_markers, pdf_bytes};

/// Stands in for the office suite: a `.docx` fixture already holds PDF bytes
/// and is copied into the scratch directory, unless its name is in `failing`.
struct FakeOffice {
    failing: Vec<&'static str>,
    produced: RefCell<Vec<PathBuf>>,
}

impl FakeOffice {
    fn new(failing: &[&'static str]) -> Self {
        Self {
            failing: failing.to_vec(),
            produced: RefCell::new(Vec::new()),
        }
    }

    fn convert(&self, source: &Path, out_dir: &Path) -> sheaf_tools::Result<PathBuf> {
        let name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.contains(&name.as_str()) {
            return Err(MergeError::Conversion {
                name,
                reason: "conversion filter rejected the file".to_string(),
            });
        }
        let target = out_dir.join(source.file_stem().expect("stem")).with_extension("pdf");
        fs::copy(source, &target)?;
        self.produced.borrow_mut().push(target.clone());
        Ok(target)
    }
}

fn write(dir: &Path, name: &str, bytes: Vec<u8>) {
    fs::write(dir.join(name), bytes).expect("fixture written");
}

#[test]
fn failed_conversion_is_skipped_and_the_rest_merge_in_name_order() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path();
    write(dir, "3.pdf", pdf_bytes("three", 2));
    write(dir, "1.pdf", pdf_bytes("one", 1));
    write(dir, "2.docx", pdf_bytes("two", 1));
    write(dir, "notes.txt", b"ignored".to_vec());

    let office = FakeOffice::new(&["2.docx"]);
    let convert = |source: &Path, out_dir: &Path| office.convert(source, out_dir);
    let report = run_batch(dir, &BatchOptions::default(), &convert).expect("batch run");

    let output = report.output.clone().expect("output written");
    assert_eq!(output, dir.join("merged.pdf"));
    let merged = fs::read(&output).expect("output read");
    assert_eq!(page_markers(&merged), ["one-p1", "three-p1", "three-p2"]);
    assert_eq!(report.page_count, 3);

    let statuses: Vec<_> = report
        .entries
        .iter()
        .map(|entry| (entry.name.as_str(), &entry.status))
        .collect();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[0], ("1.pdf", &EntryStatus::Merged { pages: 1 }));
    assert_eq!(statuses[1].0, "2.docx");
    assert!(matches!(statuses[1].1, EntryStatus::Skipped { reason } if reason.contains("2.docx")));
    assert_eq!(statuses[2], ("3.pdf", &EntryStatus::Merged { pages: 2 }));
    assert_eq!(report.skipped().count(), 1);
    assert_eq!(report.merged().count(), 2);
}

#[test]
fn converted_documents_are_merged_and_their_artifacts_removed() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path();
    write(dir, "a.pdf", pdf_bytes("a", 1));
    write(dir, "b.docx", pdf_bytes("b", 2));

    let office = FakeOffice::new(&[]);
    let convert = |source: &Path, out_dir: &Path| office.convert(source, out_dir);
    let report = run_batch(dir, &BatchOptions::default(), &convert).expect("batch run");

    let merged = fs::read(report.output.as_ref().expect("output")).expect("output read");
    assert_eq!(page_markers(&merged), ["a-p1", "b-p1", "b-p2"]);

    let produced = office.produced.borrow();
    assert_eq!(produced.len(), 1);
    assert!(produced.iter().all(|path| !path.exists()));
}

#[test]
fn previous_output_is_not_merged_into_itself() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path();
    write(dir, "a.pdf", pdf_bytes("a", 1));
    write(dir, "merged.pdf", pdf_bytes("stale", 5));

    let convert = |_: &Path, _: &Path| -> sheaf_tools::Result<PathBuf> {
        panic!("no conversion expected")
    };
    let report = run_batch(dir, &BatchOptions::default(), &convert).expect("batch run");

    assert_eq!(report.entries.len(), 1);
    let merged = fs::read(dir.join("merged.pdf")).expect("output read");
    assert_eq!(page_count(&merged), 1);
}

#[test]
fn abort_policy_stops_the_run_and_still_cleans_up() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path();
    write(dir, "1.docx", pdf_bytes("one", 1));
    write(dir, "2.docx", pdf_bytes("two", 1));
    write(dir, "3.pdf", pdf_bytes("three", 1));

    let office = FakeOffice::new(&["2.docx"]);
    let convert = |source: &Path, out_dir: &Path| office.convert(source, out_dir);
    let options = BatchOptions {
        failure_policy: FailurePolicy::Abort,
        ..BatchOptions::default()
    };

    let err = run_batch(dir, &options, &convert).expect_err("run aborted");

    assert!(matches!(err, MergeError::Conversion { name, .. } if name == "2.docx"));
    assert!(!dir.join("merged.pdf").exists());
    let produced = office.produced.borrow();
    assert_eq!(produced.len(), 1);
    assert!(!produced[0].exists());
}

#[test]
fn unreadable_pdf_is_skipped_in_batch_mode() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path();
    write(dir, "1.pdf", b"truncated download".to_vec());
    write(dir, "2.pdf", pdf_bytes("two", 1));

    let convert = |_: &Path, _: &Path| -> sheaf_tools::Result<PathBuf> {
        panic!("no conversion expected")
    };
    let report = run_batch(dir, &BatchOptions::default(), &convert).expect("batch run");

    assert_eq!(report.page_count, 1);
    assert!(matches!(report.entries[0].status, EntryStatus::Skipped { .. }));
    assert_eq!(report.entries[1].status, EntryStatus::Merged { pages: 1 });
}

#[test]
fn failing_every_input_aborts_with_serialization_error() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path();
    write(dir, "only.docx", pdf_bytes("only", 1));

    let office = FakeOffice::new(&["only.docx"]);
    let convert = |source: &Path, out_dir: &Path| office.convert(source, out_dir);

    let err = run_batch(dir, &BatchOptions::default(), &convert).expect_err("nothing to merge");
    assert!(matches!(err, MergeError::Serialization(_)));
    assert!(!dir.join("merged.pdf").exists());
}

#[test]
fn missing_directory_is_created_without_merging() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path().join("inbox");

    let convert = |_: &Path, _: &Path| -> sheaf_tools::Result<PathBuf> {
        panic!("no conversion expected")
    };
    let report = run_batch(&dir, &BatchOptions::default(), &convert).expect("batch run");

    assert!(report.directory_created);
    assert!(dir.is_dir());
    assert!(report.entries.is_empty());
    assert!(report.output.is_none());
}

#[test]
fn custom_output_name_is_used_and_excluded() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path();
    write(dir, "a.pdf", pdf_bytes("a", 1));
    write(dir, "binder.pdf", pdf_bytes("old-binder", 3));

    let options = BatchOptions {
        output_name: "binder.pdf".to_string(),
        ..BatchOptions::default()
    };
    let convert = |_: &Path, _: &Path| -> sheaf_tools::Result<PathBuf> {
        panic!("no conversion expected")
    };
    let report = run_batch(dir, &options, &convert).expect("batch run");

    assert_eq!(report.output, Some(dir.join("binder.pdf")));
    assert_eq!(page_markers(&fs::read(dir.join("binder.pdf")).expect("read")), ["a-p1"]);
}

#[test]
fn output_name_with_directory_part_is_rejected() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path();
    write(dir, "a.pdf", pdf_bytes("a", 1));
    let elsewhere = tempdir().expect("second directory");
    let absolute = elsewhere.path().join("elsewhere.pdf");

    let convert = |_: &Path, _: &Path| -> sheaf_tools::Result<PathBuf> {
        panic!("no conversion expected")
    };
    for output_name in ["./merged.pdf".to_string(), absolute.display().to_string()] {
        let options = BatchOptions {
            output_name: output_name.clone(),
            ..BatchOptions::default()
        };
        let err = run_batch(dir, &options, &convert).expect_err("name rejected");
        assert!(matches!(err, MergeError::InvalidOutputName(name) if name == output_name));
    }

    assert!(!dir.join("merged.pdf").exists());
    assert!(!absolute.exists());
    let names: Vec<_> = fs::read_dir(dir)
        .expect("dir listed")
        .map(|entry| entry.expect("entry").file_name())
        .collect();
    assert_eq!(names, ["a.pdf"]);
}

#[test]
fn repeated_runs_do_not_feed_the_output_back_in() {
    let temp_dir = tempdir().expect("temporary directory");
    let dir = temp_dir.path();
    write(dir, "a.pdf", pdf_bytes("a", 1));

    let convert = |_: &Path, _: &Path| -> sheaf_tools::Result<PathBuf> {
        panic!("no conversion expected")
    };
    run_batch(dir, &BatchOptions::default(), &convert).expect("first run");
    let second = run_batch(dir, &BatchOptions::default(), &convert).expect("second run");

    assert_eq!(second.entries.len(), 1);
    assert_eq!(second.page_count, 1);
    assert_eq!(page_markers(&fs::read(dir.join("merged.pdf")).expect("read")), ["a-p1"]);
}
