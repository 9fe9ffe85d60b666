//! Command-line interface for the `jsm` conflict engine.
//!
//! Compares two modified copies of a JSON (or YAML) document, optionally
//! against their common base and under a JSON Schema, and prints either the
//! conflict list or the merged document. The exit status tells scripts
//! whether anything still needs a human decision.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use jsm_core::{
    apply_decisions, render_conflicts, CompareMode, ConflictRecord, Decision, DetectOptions,
    DocumentFormat, Documents, MergeOutcome, Severity,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "JSM_LOG";

const EXIT_CLEAN: u8 = 0;
const EXIT_REVIEW: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    /// `@ path` hunks for conflicts, pretty JSON for merges.
    #[default]
    Text,
    /// Machine readable JSON.
    Json,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum Accept {
    Input1,
    Input2,
    Both,
    Neither,
}

impl From<Accept> for Decision {
    fn from(accept: Accept) -> Self {
        match accept {
            Accept::Input1 => Self::Input1,
            Accept::Input2 => Self::Input2,
            Accept::Both => Self::Both,
            Accept::Neither => Self::Neither,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "jsm",
    version,
    about = "Schema-aware conflict detection and merging for JSON and YAML documents.",
    after_help = "Exit status: 0 when nothing needs review, 1 when some conflict does, 2 on errors.\n\
                  Set JSM_LOG (e.g. JSM_LOG=debug) to control diagnostics on stderr."
)]
struct Cli {
    /// Common ancestor of both inputs; omit for a two-way comparison.
    #[arg(short = 'b', long = "base")]
    base: Option<PathBuf>,

    /// JSON Schema guiding array matching, unions and smart merges.
    #[arg(short = 's', long = "schema")]
    schema: Option<PathBuf>,

    /// How a three-way comparison pairs its documents.
    #[arg(short = 'm', long = "mode", default_value = "split")]
    mode: CompareMode,

    /// Read documents and schema as YAML.
    #[arg(long = "yaml", action = ArgAction::SetTrue)]
    yaml: bool,

    /// Output format.
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print the merged document instead of the conflict list.
    #[arg(long = "merge", action = ArgAction::SetTrue)]
    merge: bool,

    /// JSON object mapping conflict ids to `input1`, `input2`, `both` or `neither`.
    #[arg(short = 'd', long = "decisions")]
    decisions: Option<PathBuf>,

    /// Decision for every conflict not listed in `--decisions`.
    #[arg(short = 'a', long = "accept", value_enum)]
    accept: Option<Accept>,

    /// Soft latency budget in milliseconds; overruns are logged.
    #[arg(long = "budget-ms")]
    budget_ms: Option<u64>,

    /// Write output to FILE instead of STDOUT.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Raise diagnostics verbosity (-v info, -vv debug).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// INPUT1 and INPUT2; `-` reads INPUT2 from STDIN.
    #[arg(num_args = 0..=2)]
    inputs: Vec<OsString>,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse_from(canonicalize_args(std::env::args_os()));
    init_logging(cli.verbose);

    match try_main(&cli) {
        Ok(code) => std::process::ExitCode::from(code),
        Err(err) => {
            let _ = writeln!(io::stderr(), "error: {err:#}");
            std::process::ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn try_main(cli: &Cli) -> Result<u8> {
    let [input1, input2] = match cli.inputs.as_slice() {
        [first, second] => [InputSource::from_arg(first)?, InputSource::from_arg(second)?],
        _ => bail!("expected exactly two inputs: INPUT1 INPUT2 (see --help)"),
    };
    if matches!(input1, InputSource::Stdin) {
        bail!("only INPUT2 may be read from STDIN");
    }

    let format = if cli.yaml { DocumentFormat::Yaml } else { DocumentFormat::Json };
    let base_text = cli.base.as_ref().map(|path| read_file(path)).transpose()?;
    let schema_text = cli.schema.as_ref().map(|path| read_file(path)).transpose()?;
    let input1_text = input1.read()?;
    let input2_text = input2.read()?;

    let docs = Documents::parse(
        format,
        base_text.as_deref(),
        &input1_text,
        &input2_text,
        schema_text.as_deref(),
    )?;
    let options = build_options(cli)?;
    debug!(mode = %options.mode(), two_way = docs.base.is_none(), "documents loaded");

    let mut conflicts = docs.detect(&options);
    resolve(cli, &mut conflicts)?;
    let pending = conflicts.iter().filter(|conflict| conflict.needs_review).count();

    let (rendered, clean) = if cli.merge {
        let outcome = docs.merge(&conflicts, &options);
        report_issues(&outcome);
        (render_merge(&outcome, cli.format)?, outcome.is_valid && pending == 0)
    } else {
        (render_list(&conflicts, cli.format)?, pending == 0)
    };

    if let Some(path) = &cli.output {
        fs::write(path, rendered.as_bytes())
            .with_context(|| format!("failed to write output to {}", path.display()))?;
    } else {
        print!("{rendered}");
        io::stdout().flush().ok();
    }

    Ok(if clean { EXIT_CLEAN } else { EXIT_REVIEW })
}

fn build_options(cli: &Cli) -> Result<DetectOptions> {
    let mut options = DetectOptions::default().with_mode(cli.mode);
    if let Some(ms) = cli.budget_ms {
        options = options.with_budget(Duration::from_millis(ms)).map_err(|err| anyhow!(err))?;
    }
    Ok(options)
}

/// Applies `--decisions` first, then `--accept` to everything still open.
fn resolve(cli: &Cli, conflicts: &mut [ConflictRecord]) -> Result<()> {
    let mut decisions = match &cli.decisions {
        Some(path) => parse_decisions(&read_file(path)?)
            .with_context(|| format!("failed to parse decisions in {}", path.display()))?,
        None => BTreeMap::new(),
    };
    if let Some(accept) = cli.accept {
        for conflict in conflicts.iter() {
            decisions.entry(conflict.id.clone()).or_insert_with(|| accept.into());
        }
    }
    for id in apply_decisions(conflicts, &decisions) {
        warn!(%id, "decision refers to an unknown conflict");
    }
    Ok(())
}

fn parse_decisions(raw: &str) -> Result<BTreeMap<String, Decision>> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let serde_json::Value::Object(entries) = value else {
        bail!("decisions must be a JSON object keyed by conflict id");
    };
    entries
        .into_iter()
        .map(|(id, choice)| {
            let name =
                choice.as_str().ok_or_else(|| anyhow!("decision for {id} must be a string"))?;
            let decision = name.parse::<Decision>().map_err(|err| anyhow!("{id}: {err}"))?;
            Ok((id, decision))
        })
        .collect()
}

fn render_list(conflicts: &[ConflictRecord], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_conflicts(conflicts),
        OutputFormat::Json => {
            let mut rendered =
                serde_json::to_string_pretty(conflicts).context("failed to serialize conflicts")?;
            rendered.push('\n');
            rendered
        }
    })
}

fn render_merge(outcome: &MergeOutcome, format: OutputFormat) -> Result<String> {
    let mut rendered = match format {
        OutputFormat::Text => outcome.content.clone(),
        OutputFormat::Json => {
            serde_json::to_string_pretty(outcome).context("failed to serialize merge outcome")?
        }
    };
    rendered.push('\n');
    Ok(rendered)
}

fn report_issues(outcome: &MergeOutcome) {
    let mut stderr = io::stderr().lock();
    for issue in outcome.issues.iter().filter(|issue| issue.severity != Severity::Info) {
        let _ = writeln!(stderr, "{}: {}", issue.severity, issue.message);
    }
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    fn from_arg(input: &OsString) -> Result<Self> {
        if input == "-" {
            return Ok(Self::Stdin);
        }
        let path = PathBuf::from(input);
        if path.as_os_str().is_empty() {
            bail!("expected file path; got empty string");
        }
        Ok(Self::File(path))
    }

    fn read(&self) -> Result<String> {
        match self {
            Self::File(path) => read_file(path),
            Self::Stdin => {
                let mut buffer = String::new();
                io::stdin().read_to_string(&mut buffer).context("failed to read STDIN")?;
                Ok(buffer)
            }
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Accepts the single-dash spellings (`-yaml`, `-mode=sequential`) common in
/// merge driver configurations.
fn canonicalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    const SWITCHES: [&str; 4] = ["-help", "-version", "-yaml", "-merge"];
    const VALUED: [&str; 6] = ["-base", "-schema", "-mode", "-format", "-decisions", "-accept"];

    let mut canonicalized = Vec::new();
    for (idx, arg) in args.into_iter().enumerate() {
        if idx == 0 {
            canonicalized.push(arg);
            continue;
        }
        let Some(text) = arg.to_str() else {
            canonicalized.push(arg);
            continue;
        };
        if SWITCHES.contains(&text) || VALUED.contains(&text) {
            canonicalized.push(OsString::from(format!("-{text}")));
            continue;
        }
        match text.split_once('=') {
            Some((flag, value)) if VALUED.contains(&flag) => {
                canonicalized.push(OsString::from(format!("-{flag}")));
                canonicalized.push(OsString::from(value));
            }
            _ => canonicalized.push(arg),
        }
    }
    canonicalized
}

#[cfg(test)]
mod tests {
    use super::{canonicalize_args, parse_decisions, Cli, OutputFormat};
    use clap::Parser;
    use jsm_core::{CompareMode, Decision};
    use std::ffi::OsString;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn canonicalizes_single_dash_variants() {
        let canonicalized =
            canonicalize_args(os(&["jsm", "-help", "-yaml", "-merge", "--other", "-v"]));
        assert_eq!(canonicalized, os(&["jsm", "--help", "--yaml", "--merge", "--other", "-v"]));
    }

    #[test]
    fn canonicalizes_inline_values() {
        let canonicalized =
            canonicalize_args(os(&["jsm", "-mode=sequential", "-base", "b.json", "-f=json"]));
        assert_eq!(
            canonicalized,
            os(&["jsm", "--mode", "sequential", "--base", "b.json", "-f=json"])
        );
    }

    #[test]
    fn parses_full_flag_surface() {
        let cli = Cli::try_parse_from(os(&[
            "jsm", "--base", "b.json", "--mode", "sequential", "-f", "json", "--accept", "both",
            "-vv", "x.json", "y.json",
        ]))
        .unwrap();
        assert_eq!(cli.mode, CompareMode::Sequential);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.inputs.len(), 2);
    }

    #[test]
    fn decisions_file_accepts_aliases() {
        let decisions =
            parse_decisions(r#"{"conflict-1":"theirs","conflict-2":"neither"}"#).unwrap();
        assert_eq!(decisions["conflict-1"], Decision::Input1);
        assert_eq!(decisions["conflict-2"], Decision::Neither);
        assert!(parse_decisions(r#"{"conflict-1":"maybe"}"#).is_err());
        assert!(parse_decisions("[]").is_err());
    }

    #[test]
    fn output_format_default_is_text() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }
}
