//! frappe-diff command-line interface.
//!
//! Runs either as a regular two-file diff (`frappe-diff OLD NEW`) or as a git
//! external diff driver, in which case git passes seven positional arguments.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use frappe_diff::git::{self, DriverArgs};
use frappe_diff::{compare_documents, format_diff, parse_file, DiffConfig, OutputFormat, OutputOptions};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

/// frappe-diff - structural diff for Frappe JSON metadata
///
/// Pairs fields, permissions and workflow states by identity, shows source
/// line numbers for both versions, and expands print-format layouts stored
/// as JSON text.
#[derive(Parser)]
#[command(name = "frappe-diff")]
#[command(version)]
#[command(about = "Structural diff for Frappe JSON metadata", long_about = None)]
struct Cli {
    /// Base (old) version of the file
    #[arg(value_name = "OLD", required_unless_present_any = ["git_install", "git_uninstall", "git_status"])]
    old: Option<PathBuf>,

    /// Head (new) version of the file
    #[arg(value_name = "NEW", required_unless_present_any = ["git_install", "git_uninstall", "git_status"])]
    new: Option<PathBuf>,

    /// Render a table instead of a tree
    #[arg(long, env = "TABLE_MODE", value_parser = clap::builder::FalseyValueParser::new())]
    table: bool,

    /// Output format (overrides --table)
    #[arg(short = 'f', long, value_enum)]
    format: Option<OutputFormatArg>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    no_color: bool,

    /// Maximum length for displayed values
    #[arg(long, default_value = "120")]
    max_value_length: usize,

    /// Verbose output (parsing and pairing progress on stderr)
    #[arg(short, long)]
    verbose: bool,

    /// Register frappe-diff as a git diff driver in the global git config
    #[arg(long)]
    git_install: bool,

    /// Remove frappe-diff from the global git config
    #[arg(long)]
    git_uninstall: bool,

    /// Show the git configuration for frappe-diff
    #[arg(long)]
    git_status: bool,
}

/// Output format argument for clap
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormatArg {
    /// Changes nested under keys and record identities
    Tree,
    /// One row per change with line numbers and paths
    Table,
    /// JSON representation
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Tree => OutputFormat::Tree,
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Rendering settings shared by both invocation modes.
struct Settings {
    format: OutputFormat,
    options: OutputOptions,
}

impl Settings {
    fn from_cli(cli: &Cli) -> Self {
        let format = match cli.format {
            Some(arg) => arg.into(),
            None if cli.table => OutputFormat::Table,
            None => OutputFormat::Tree,
        };
        Self {
            format,
            options: OutputOptions {
                color: !cli.no_color,
                max_value_length: cli.max_value_length,
            },
        }
    }

    /// Git driver mode has no flags; only the environment is consulted.
    fn from_env() -> Self {
        let table = env_flag("TABLE_MODE");
        Self {
            format: if table {
                OutputFormat::Table
            } else {
                OutputFormat::Tree
            },
            options: OutputOptions {
                color: !env_flag("NO_COLOR"),
                ..Default::default()
            },
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| {
            let value = value.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off" | "n" | "f")
        })
        .unwrap_or(false)
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let result = match git::detect_git_diff_driver_args(&args) {
        Some(driver) => {
            init_logging(false);
            run_driver(driver, Settings::from_env())
        }
        None => {
            let cli = Cli::parse();
            init_logging(cli.verbose);
            run(cli)
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        process::exit(2);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if cli.git_install {
        return git::install().context("Failed to install git diff driver");
    }
    if cli.git_uninstall {
        return git::uninstall().context("Failed to uninstall git diff driver");
    }
    if cli.git_status {
        return git::status().context("Failed to read git configuration");
    }

    let settings = Settings::from_cli(&cli);
    let (old, new) = match (cli.old, cli.new) {
        (Some(old), Some(new)) => (old, new),
        _ => anyhow::bail!("both OLD and NEW files are required"),
    };

    let old = old.to_string_lossy().into_owned();
    let new = new.to_string_lossy().into_owned();
    let label = if git::is_null_file(&new) { &old } else { &new };

    compare_pair(label, &old, &new, &settings)
}

fn run_driver(driver: DriverArgs, settings: Settings) -> Result<()> {
    log::info!("git diff driver for {}", driver.path);

    if !is_json_path(&driver.path) {
        println!("Skipped (not JSON): {}", file_name(&driver.path));
        return Ok(());
    }

    compare_pair(&driver.path, &driver.old_file, &driver.new_file, &settings)
}

/// Compares one file pair, reporting whole-file additions and removals.
fn compare_pair(label: &str, old: &str, new: &str, settings: &Settings) -> Result<()> {
    if !settings.options.color {
        colored::control::set_override(false);
    }

    let name = file_name(label);

    if git::is_null_file(new) {
        println!("{}", format!("Removed: {}", name).red().bold());
        return Ok(());
    }
    if git::is_null_file(old) {
        println!("{}", format!("Added: {}", name).green().bold());
        return Ok(());
    }

    log::info!("Parsing {}...", old);
    let base = parse_file(Path::new(old))
        .with_context(|| format!("Failed to parse base file: {}", old))?;

    log::info!("Parsing {}...", new);
    let head = parse_file(Path::new(new))
        .with_context(|| format!("Failed to parse head file: {}", new))?;

    if label.contains("custom") {
        println!("{}", "Custom File:".magenta().bold());
    }

    log::info!("Computing diff...");
    let diff = compare_documents(&base, &head, &DiffConfig::default());

    let output = format_diff(&diff, &name, &settings.format, &settings.options)
        .context("Failed to format diff output")?;
    println!("{}", output);

    Ok(())
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn is_json_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_conversion() {
        assert_eq!(OutputFormat::from(OutputFormatArg::Tree), OutputFormat::Tree);
        assert_eq!(OutputFormat::from(OutputFormatArg::Table), OutputFormat::Table);
        assert_eq!(OutputFormat::from(OutputFormatArg::Json), OutputFormat::Json);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("apps/crm/doctype/lead/lead.json"), "lead.json");
        assert_eq!(file_name("lead.json"), "lead.json");
    }

    #[test]
    fn test_is_json_path() {
        assert!(is_json_path("a/b/task.json"));
        assert!(is_json_path("TASK.JSON"));
        assert!(!is_json_path("task.py"));
        assert!(!is_json_path("README"));
    }
}
