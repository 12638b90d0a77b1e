use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sheaf_tools::batch::{self, EntryStatus};
use sheaf_tools::config::{FailurePolicy, MergeOptions};
use sheaf_tools::convert::SofficeConverter;
use sheaf_tools::io::{pdf_file_name, stacked_file_name};
use sheaf_tools::model::MergedTable;
use sheaf_tools::pipeline;
use sheaf_tools::{MergeError, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_PREVIEW_ROWS: usize = 200;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_tracing()?;
    let options = match &cli.config {
        Some(path) => MergeOptions::from_path(path)?,
        None => MergeOptions::default(),
    };

    match cli.command {
        Command::Stack(args) => execute_stack(args, options),
        Command::Concat(args) => execute_concat(args, options),
        Command::Batch(args) => execute_batch(args, options),
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| MergeError::Logging(err.to_string()))
}

fn execute_stack(args: StackArgs, options: MergeOptions) -> Result<()> {
    let mut stack = options.stack;
    if let Some(name) = args.sheet_name {
        stack.output_sheet_name = name;
    }
    if let Some(name) = args.provenance_column {
        stack.provenance_column_name = name;
    }
    if args.no_provenance {
        stack.add_provenance_column = false;
    }
    if args.intersect {
        stack.union_columns = false;
    }
    if args.keep_types {
        stack.coerce_to_text = false;
    }

    let output = args
        .output
        .unwrap_or_else(|| sibling_path(&args.input, &stacked_file_name(&file_name(&args.input))));
    let stacked = pipeline::stack_file(&args.input, &output, &stack)?;

    println!(
        "read {} sheet(s): {}",
        stacked.sheet_names.len(),
        stacked.sheet_names.join(", ")
    );
    if args.preview > 0 {
        print_preview(&stacked.table, args.preview);
    }
    println!("wrote {}", output.display());
    Ok(())
}

fn execute_concat(args: ConcatArgs, options: MergeOptions) -> Result<()> {
    let mut concat = options.concat;
    if args.skip_failed {
        concat.failure_policy = FailurePolicy::SkipFailed;
    }
    if args.no_compress {
        concat.compress = false;
    }

    for (index, input) in args.inputs.iter().enumerate() {
        println!("{}. {}", index + 1, input.display());
    }

    let output = PathBuf::from(pdf_file_name(&args.output));
    let outcome = pipeline::concat_files(&args.inputs, &output, &concat, |progress| {
        info!("progress {:.0}%", progress.fraction() * 100.0);
    })?;

    for skipped in &outcome.skipped {
        println!("skipped {}: {}", skipped.name, skipped.reason);
    }
    println!(
        "wrote {} ({} page(s) from {} document(s))",
        output.display(),
        outcome.page_count,
        outcome.merged.len()
    );
    Ok(())
}

fn execute_batch(args: BatchArgs, options: MergeOptions) -> Result<()> {
    let mut batch_options = options.batch;
    if let Some(name) = args.output_name {
        batch_options.output_name = pdf_file_name(&name);
    }
    if args.abort_on_error {
        batch_options.failure_policy = FailurePolicy::Abort;
    }
    if let Some(program) = args.converter {
        batch_options.converter_program = program;
    }

    let converter = SofficeConverter::new(batch_options.converter_program.clone());
    let report = batch::run_batch(&args.dir, &batch_options, &converter)?;

    if report.directory_created {
        println!(
            "created {}; put PDF or Word files there and run again",
            args.dir.display()
        );
        return Ok(());
    }

    for entry in &report.entries {
        match &entry.status {
            EntryStatus::Merged { pages } => println!("[ok]   {} ({pages} page(s))", entry.name),
            EntryStatus::Skipped { reason } => println!("[skip] {}: {reason}", entry.name),
        }
    }
    if let Some(output) = &report.output {
        println!("wrote {} ({} page(s))", output.display(), report.page_count);
    }
    Ok(())
}

fn print_preview(table: &MergedTable, limit: usize) {
    println!("{}", table.columns.join("\t"));
    for row in table.head(limit) {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", cells.join("\t"));
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sibling_path(path: &Path, name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Stack workbook sheets into one table or merge documents into one PDF."
)]
struct Cli {
    /// Optional JSON file with merge options.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stack every sheet of a workbook into a single sheet.
    Stack(StackArgs),
    /// Concatenate PDF files in the order given.
    Concat(ConcatArgs),
    /// Merge every PDF and Word file of a directory, in file-name order.
    Batch(BatchArgs),
}

#[derive(clap::Args)]
struct StackArgs {
    /// Workbook to stack.
    #[arg(long)]
    input: PathBuf,

    /// Output workbook path. Defaults to `<input>__stacked.xlsx`.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Name of the output sheet.
    #[arg(long)]
    sheet_name: Option<String>,

    /// Name of the column recording the source sheet.
    #[arg(long)]
    provenance_column: Option<String>,

    /// Do not add the source sheet column.
    #[arg(long)]
    no_provenance: bool,

    /// Keep only the columns shared by every sheet.
    #[arg(long)]
    intersect: bool,

    /// Keep numbers, booleans, and dates typed instead of reading them as text.
    #[arg(long)]
    keep_types: bool,

    /// Number of stacked rows to print; 0 disables the preview.
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    preview: usize,
}

#[derive(clap::Args)]
struct ConcatArgs {
    /// PDF files in merge order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file name; `.pdf` is appended when missing.
    #[arg(long, default_value = "merged_document")]
    output: String,

    /// Leave unreadable inputs out instead of aborting.
    #[arg(long)]
    skip_failed: bool,

    /// Write content streams uncompressed.
    #[arg(long)]
    no_compress: bool,
}

#[derive(clap::Args)]
struct BatchArgs {
    /// Directory holding the documents; created when missing.
    #[arg(long)]
    dir: PathBuf,

    /// Name of the merged file written into the directory.
    #[arg(long)]
    output_name: Option<String>,

    /// Abort on the first input that cannot be converted or read.
    #[arg(long)]
    abort_on_error: bool,

    /// Program used to convert Word documents to PDF.
    #[arg(long)]
    converter: Option<PathBuf>,
}
