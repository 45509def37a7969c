//! Command-line interface orchestration for the maguro builder.
//!
//! Offers three commands: `build` constructs and persists a table from a
//! raw key file, `verify` replays a key file against a persisted table,
//! and `inspect` renders the metadata sidecar.

use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use maguro_core::{
    BuildReport, HashFunction, KeySource, MaguroBuilder, MaguroError, MaskFunction,
    PerfectHashTable, TableInfoHeader,
};
use maguro_providers_keys::{KeysProviderError, MappedKeys};
use thiserror::Error;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "maguro", about = "Build and query perfect-hash tables over 32-bit key files.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build a perfect-hash table from a key file.
    Build(BuildCommand),
    /// Verify a persisted table against a key file.
    Verify(VerifyCommand),
    /// Print the metadata record of a persisted table.
    Inspect(InspectCommand),
}

/// Masking strategies selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MaskFunctionArg {
    /// Remainder by the table size; supports non-power-of-two tables.
    Modulus,
    /// Power-of-two AND mask.
    And,
    /// Pick a fold depth automatically from the mask width.
    FoldAuto,
    /// Fold the upper bits once before masking.
    FoldOnce,
    /// Fold twice before masking.
    FoldTwice,
    /// Fold three times before masking.
    FoldThrice,
}

impl From<MaskFunctionArg> for MaskFunction {
    fn from(arg: MaskFunctionArg) -> Self {
        match arg {
            MaskFunctionArg::Modulus => Self::Modulus,
            MaskFunctionArg::And => Self::And,
            MaskFunctionArg::FoldAuto => Self::FoldAuto,
            MaskFunctionArg::FoldOnce => Self::FoldOnce,
            MaskFunctionArg::FoldTwice => Self::FoldTwice,
            MaskFunctionArg::FoldThrice => Self::FoldThrice,
        }
    }
}

/// Hash functions selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HashFunctionArg {
    /// Multiply-xorshift mixing.
    MultiplyRotate,
    /// Jenkins-style triple mix.
    Jenkins,
}

impl From<HashFunctionArg> for HashFunction {
    fn from(arg: HashFunctionArg) -> Self {
        match arg {
            HashFunctionArg::MultiplyRotate => Self::MultiplyRotate,
            HashFunctionArg::Jenkins => Self::Jenkins,
        }
    }
}

/// Options accepted by the `build` command.
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// Path to a raw little-endian u32 key file.
    pub keys: PathBuf,

    /// Output table path (defaults to the key file with a `.pht` extension).
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Masking strategy.
    #[arg(long, value_enum, default_value = "and")]
    pub mask_function: MaskFunctionArg,

    /// Seeded hash function.
    #[arg(long, value_enum, default_value = "multiply-rotate")]
    pub hash_function: HashFunctionArg,

    /// Pre-select the initial table size instead of the heuristic.
    #[arg(long)]
    pub table_elements: Option<u32>,

    /// Solver worker width (defaults to the machine parallelism).
    #[arg(long)]
    pub max_concurrency: Option<NonZeroUsize>,

    /// Attempts before the table is doubled.
    #[arg(long)]
    pub resize_threshold: Option<u64>,

    /// Maximum number of table doublings.
    #[arg(long)]
    pub resize_limit: Option<u32>,

    /// Override name for the key source (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,
}

/// Options accepted by the `verify` command.
#[derive(Debug, Args, Clone)]
pub struct VerifyCommand {
    /// Path to the key file the table was built from.
    pub keys: PathBuf,

    /// Path to the persisted table.
    pub table: PathBuf,
}

/// Options accepted by the `inspect` command.
#[derive(Debug, Args, Clone)]
pub struct InspectCommand {
    /// Path to the persisted table.
    pub table: PathBuf,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Key file ingestion failed.
    #[error(transparent)]
    Keys(#[from] KeysProviderError),
    /// Core orchestration failed.
    #[error(transparent)]
    Core(#[from] MaguroError),
    /// Loading a persisted table failed.
    #[error(transparent)]
    Load(#[from] maguro_core::LoadError),
    /// A persisted table maps two keys to the same index.
    #[error("keys {key:#010x} and {previous_key:#010x} both map to index {index}")]
    Verification {
        /// Index produced by both keys.
        index: u32,
        /// Key that collided.
        key: u32,
        /// Key seen earlier with the same index.
        previous_key: u32,
    },
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug)]
pub enum ExecutionSummary {
    /// A table was built and persisted.
    Build(Box<BuildReport>),
    /// A persisted table was replayed against its key set.
    Verify {
        /// Name of the key source.
        key_source: String,
        /// Keys checked.
        keys: u64,
        /// Index space size of the table.
        index_size: u32,
    },
    /// A metadata record was read.
    Inspect(Box<TableInfoHeader>),
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading inputs, building, or verification
/// fails.
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Build(build) => run_build(build),
        Command::Verify(verify) => run_verify(&verify),
        Command::Inspect(inspect) => run_inspect(&inspect),
    }
}

fn run_build(command: BuildCommand) -> Result<ExecutionSummary, CliError> {
    let name = derive_source_name(&command.keys, command.name.as_deref());
    let keys = MappedKeys::try_from_path(name, &command.keys)?;

    let mut builder = MaguroBuilder::new()
        .with_mask_function(command.mask_function.into())
        .with_hash_function(command.hash_function.into());
    if let Some(elements) = command.table_elements {
        builder = builder.with_requested_table_elements(elements);
    }
    if let Some(workers) = command.max_concurrency {
        builder = builder.with_max_concurrency(workers);
    }
    if let Some(threshold) = command.resize_threshold {
        builder = builder.with_resize_threshold(threshold);
    }
    if let Some(limit) = command.resize_limit {
        builder = builder.with_resize_limit(limit);
    }

    let maguro = builder.build()?;
    let output = command
        .output
        .unwrap_or_else(|| command.keys.with_extension("pht"));
    let report = maguro.build(&keys, &output)?;
    Ok(ExecutionSummary::Build(Box::new(report)))
}

fn run_verify(command: &VerifyCommand) -> Result<ExecutionSummary, CliError> {
    let name = derive_source_name(&command.keys, None);
    let keys = MappedKeys::try_from_path(name, &command.keys)?;
    let table = PerfectHashTable::load(&command.table)?;

    let mut seen_key = vec![None::<u32>; table.index_size() as usize];
    for &key in keys.keys() {
        let index = table.index(key);
        if let Some(previous_key) = seen_key[index as usize] {
            return Err(CliError::Verification {
                index,
                key,
                previous_key,
            });
        }
        seen_key[index as usize] = Some(key);
    }

    Ok(ExecutionSummary::Verify {
        key_source: keys.name().to_owned(),
        keys: keys.len() as u64,
        index_size: table.index_size(),
    })
}

fn run_inspect(command: &InspectCommand) -> Result<ExecutionSummary, CliError> {
    let table = PerfectHashTable::load(&command.table)?;
    Ok(ExecutionSummary::Inspect(Box::new(*table.header())))
}

fn derive_source_name(path: &Path, override_name: Option<&str>) -> String {
    if let Some(name) = override_name {
        return name.to_owned();
    }

    path.file_stem()
        .and_then(|value| value.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| "keys".to_owned())
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary {
        ExecutionSummary::Build(report) => {
            writeln!(writer, "key source: {}", report.key_source())?;
            writeln!(writer, "keys: {}", report.number_of_keys())?;
            writeln!(writer, "table elements: {}", report.table_elements())?;
            writeln!(writer, "index size: {}", report.index_size())?;
            writeln!(writer, "attempts: {}", report.attempts())?;
            writeln!(writer, "failed attempts: {}", report.failed_attempts())?;
            writeln!(writer, "resize events: {}", report.resize_events())?;
            let seeds = report.seeds().as_array();
            writeln!(
                writer,
                "seeds: {:#010x} {:#010x} {:#010x} {:#010x}",
                seeds[0], seeds[1], seeds[2], seeds[3]
            )?;
            writeln!(writer, "table: {}", report.table_path().display())?;
            writeln!(writer, "info: {}", report.info_path().display())?;
            let timings = report.timings();
            writeln!(writer, "solve: {} us", timings.solve.micros)?;
            writeln!(writer, "verify: {} us", timings.verify.micros)?;
        }
        ExecutionSummary::Verify {
            key_source,
            keys,
            index_size,
        } => {
            writeln!(writer, "key source: {key_source}")?;
            writeln!(writer, "keys: {keys}")?;
            writeln!(writer, "index size: {index_size}")?;
            writeln!(writer, "verification: ok")?;
        }
        ExecutionSummary::Inspect(header) => {
            writeln!(writer, "algorithm: {}", header.algorithm_id)?;
            writeln!(writer, "hash function: {}", header.hash_function_id)?;
            writeln!(writer, "mask function: {}", header.mask_function_id)?;
            writeln!(writer, "keys: {}", header.number_of_keys)?;
            writeln!(writer, "table elements: {}", header.number_of_table_elements)?;
            writeln!(writer, "hash size: {}", header.hash_size)?;
            writeln!(writer, "index size: {}", header.index_size)?;
            writeln!(
                writer,
                "seeds: {:#010x} {:#010x} {:#010x} {:#010x}",
                header.seed1, header.seed2, header.seed3, header.seed4
            )?;
            writeln!(writer, "attempts: {}", header.total_attempts)?;
            writeln!(writer, "failed attempts: {}", header.failed_attempts)?;
            writeln!(writer, "solutions: {}", header.solutions_found)?;
            writeln!(
                writer,
                "resize events: {}",
                header.number_of_table_resize_events
            )?;
        }
    }
    Ok(())
}
