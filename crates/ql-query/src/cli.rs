//! Command dispatch and output for the `ql-query` binary.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use quodlibet_query::{DiacriticTable, Query, QueryOptions, QueryType};

use crate::config::{CliConfig, LogLevel, parse_star};
use crate::error::CliError;
use crate::records::JsonRecord;

/// Filter tagged records with Quod Libet queries.
#[derive(Parser, Debug)]
#[command(name = "ql-query", version, about)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,
    /// Comma-separated tags searched by terms that name no tag.
    #[arg(long, global = true)]
    pub star: Option<String>,
    /// Match accented letters literally in free-text searches.
    #[arg(long, global = true)]
    pub no_diacritics: bool,
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the JSON-lines records that match a query.
    Filter {
        /// Query string, structured or free text.
        query: String,
        /// Read records from this file instead of stdin.
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
    /// Report whether each query is valid, free text or invalid.
    Classify {
        /// Query strings to classify.
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Compare the built-in diacritic table with a live Unicode scan.
    CheckDiacritics,
}

impl Cli {
    /// Merge the environment configuration with command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidConfig` if the environment or `--star`
    /// holds an invalid value.
    pub fn config(&self) -> Result<CliConfig, CliError> {
        let star = self.star.as_deref().map(parse_star).transpose()?;
        let diacritics = self.no_diacritics.then_some(false);
        Ok(CliConfig::from_env()?.apply_overrides(self.log_level, star, diacritics))
    }
}

/// Run `command`, writing its output to `out`.
///
/// Returns `Ok(false)` when the command completed but its check failed.
///
/// # Errors
///
/// Returns an error if a query does not compile, a record cannot be read or
/// parsed, or output cannot be written.
pub fn run(command: &Command, config: &CliConfig, out: &mut dyn Write) -> Result<bool> {
    let passed = match command {
        Command::Filter { query, input } => {
            let query = Query::with_options(query, &config.query_options())
                .wrap_err_with(|| format!("invalid query {query:?}"))?;
            tracing::debug!(kind = %query.kind(), matcher = %query.matcher(), "compiled query");
            match input {
                Some(path) => {
                    let file = File::open(path)
                        .wrap_err_with(|| format!("failed to open {}", path.display()))?;
                    filter_records(&query, BufReader::new(file), out)?;
                }
                None => {
                    filter_records(&query, io::stdin().lock(), out)?;
                }
            }
            true
        }
        Command::Classify { queries } => {
            classify(queries, &config.query_options(), out)?;
            true
        }
        Command::CheckDiacritics => check_diacritics(out)?,
    };
    out.flush().wrap_err("failed to flush output")?;
    Ok(passed)
}

/// Copy every JSON-lines record matching `query` from `reader` to `out`.
///
/// Blank lines are skipped. Returns the number of records written.
///
/// # Errors
///
/// Returns an error if a line cannot be read, is not a JSON object, or the
/// output cannot be written.
pub fn filter_records<R: BufRead>(query: &Query, reader: R, out: &mut dyn Write) -> Result<usize> {
    let mut matched = 0;
    let mut total = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line.wrap_err("failed to read records")?;
        if line.trim().is_empty() {
            continue;
        }
        total += 1;
        let record: JsonRecord = serde_json::from_str(&line)
            .wrap_err_with(|| format!("line {} is not a JSON record", index + 1))?;
        if query.search(&record) {
            writeln!(out, "{line}").wrap_err("failed to write record")?;
            matched += 1;
        }
    }
    tracing::info!(matched, total, "filtered records");
    Ok(matched)
}

/// Write `kind<TAB>query` for every query string.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn classify(queries: &[String], options: &QueryOptions, out: &mut dyn Write) -> Result<()> {
    for source in queries {
        let kind = match Query::with_options(source, options) {
            Ok(query) => query.kind(),
            Err(err) => {
                tracing::debug!(error = %err, query = %source, "query is invalid");
                QueryType::Invalid
            }
        };
        writeln!(out, "{kind}\t{source}")
            .wrap_err_with(|| format!("failed to write classification of {source:?}"))?;
    }
    Ok(())
}

/// Report mark sequences whose letters differ between the snapshot and a
/// live scan. Returns whether the two agree.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn check_diacritics(out: &mut dyn Write) -> Result<bool> {
    let snapshot = DiacriticTable::snapshot();
    let live = DiacriticTable::regenerate();
    if *snapshot == live {
        writeln!(out, "diacritic table is current").wrap_err("failed to write report")?;
        return Ok(true);
    }

    let sequences: BTreeSet<&String> =
        snapshot.marks().keys().chain(live.marks().keys()).collect();
    let letters = |set: Option<&BTreeSet<char>>| -> String {
        set.map(|letters| letters.iter().collect()).unwrap_or_default()
    };
    for sequence in sequences {
        let old = snapshot.marks().get(sequence);
        let new = live.marks().get(sequence);
        if old != new {
            writeln!(
                out,
                "{}\tsnapshot={}\tlive={}",
                sequence.escape_unicode(),
                letters(old),
                letters(new)
            )
            .wrap_err("failed to write report")?;
        }
    }
    writeln!(out, "diacritic table is stale").wrap_err("failed to write report")?;
    Ok(false)
}
