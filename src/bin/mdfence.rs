//! mdfence CLI
//!
//! Add, update or remove the language of fenced code blocks, or delete their
//! leading lines, in one Markdown file or every Markdown file of a directory.

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use log::{warn, LevelFilter};
use mdfence::charset::decode_transient;
use mdfence::walk::{self, DEFAULT_SCAN_TIMEOUT};
use mdfence::{apply, DocumentConfig, NewlineMode, Operation, Scope};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mdfence")]
#[command(author = "nzinfo <li.monan@gmail.com>")]
#[command(version)]
#[command(about = "Edit fenced code blocks in Markdown files, keeping their encoding")]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["addl", "updl", "rmvl", "delcl"]),
))]
struct Cli {
    /// Markdown file, or directory containing Markdown files
    #[arg(short, long)]
    path: PathBuf,

    /// Add a language to code blocks that have none
    #[arg(long, visible_alias = "add-language", requires = "language")]
    addl: bool,

    /// Set the language of every code block
    #[arg(long, visible_alias = "update-language", requires = "language")]
    updl: bool,

    /// Remove the language of every code block
    #[arg(long, visible_alias = "remove-language")]
    rmvl: bool,

    /// Delete the first N lines of every code block
    #[arg(long, visible_alias = "delete-code-line", requires = "line")]
    delcl: bool,

    /// Code block language
    #[arg(short, long)]
    language: Option<OsString>,

    /// Number of lines to delete
    #[arg(short = 'n', long)]
    line: Option<usize>,

    /// Only edit from this line on; a negative value edits up to that line counted from the end
    #[arg(short, long, allow_negative_numbers = true, default_value_t = 0)]
    start: i64,

    /// Directory scan time limit in seconds
    #[arg(long, default_value_t = DEFAULT_SCAN_TIMEOUT.as_secs_f64())]
    timeout: f64,

    /// Write `\n` line endings instead of restoring the original ones
    #[arg(long)]
    keep_lf: bool,

    /// More output (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn language(&self) -> Result<String> {
        let language = self
            .language
            .as_ref()
            .context("A language is required, use -l")?;
        Ok(decode_transient(language.as_encoded_bytes()))
    }

    fn operation(&self) -> Result<Operation> {
        let op = if self.addl {
            Operation::AddLanguage(self.language()?)
        } else if self.updl {
            Operation::UpdateLanguage(self.language()?)
        } else if self.rmvl {
            Operation::RemoveLanguage
        } else {
            let count = self.line.context("A line count is required, use -n")?;
            Operation::delete_leading_lines(count)?
        };
        op.validate()?;
        Ok(op)
    }

    fn timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.timeout)
            .with_context(|| format!("Invalid timeout: {}", self.timeout))
    }

    fn config(&self) -> DocumentConfig {
        DocumentConfig {
            newline: if self.keep_lf {
                NewlineMode::Normalize
            } else {
                NewlineMode::Restore
            },
            scope: Scope::from_line(self.start),
            ..DocumentConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let op = cli.operation()?;
    let timeout = cli.timeout()?;
    let config = cli.config();

    let summary = walk::run(&cli.path, timeout, |path| apply(path, &op, &config))
        .inspect_err(|err| {
            if matches!(err, mdfence::Error::ScanTimeout { .. }) {
                warn!("use --timeout to allow more time for large directories");
            }
        })
        .with_context(|| format!("Failed to {}: {}", op, cli.path.display()))?;

    if !summary.is_success() {
        bail!("{} of {} file(s) failed", summary.failed, summary.processed);
    }

    Ok(())
}
