mod input;
mod migrate;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use apishift_core::{check_store, MatchConfig, Matcher};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Carry curated API annotations across library versions.
#[derive(Parser)]
#[command(
    name = "apishift",
    version,
    about = "Carry curated API annotations across library versions"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log matcher decisions to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Matcher configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate an annotation store from one API version to the next
    Migrate {
        /// Path to the v1 API snapshot (JSON)
        api_v1: PathBuf,
        /// Path to the v2 API snapshot (JSON)
        api_v2: PathBuf,
        /// Path to the annotation store written against v1 (JSON)
        annotations: PathBuf,
        /// Directory for the migrated store and the report
        #[arg(long)]
        out: PathBuf,
    },

    /// Show the element correspondences between two API snapshots
    Match {
        /// Path to the v1 API snapshot (JSON)
        api_v1: PathBuf,
        /// Path to the v2 API snapshot (JSON)
        api_v2: PathBuf,
    },

    /// Check an annotation store against the API snapshot it describes
    Check {
        /// Path to the API snapshot (JSON)
        api: PathBuf,
        /// Path to the annotation store (JSON)
        annotations: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Migrate {
            api_v1,
            api_v2,
            annotations,
            out,
        } => {
            let config = load_config_or_exit(cli.config.as_deref(), cli.output, cli.quiet);
            migrate::cmd_migrate(
                &api_v1,
                &api_v2,
                &annotations,
                &out,
                &config,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Match { api_v1, api_v2 } => {
            let config = load_config_or_exit(cli.config.as_deref(), cli.output, cli.quiet);
            cmd_match(&api_v1, &api_v2, &config, cli.output, cli.quiet);
        }
        Commands::Check { api, annotations } => {
            cmd_check(&api, &annotations, cli.output, cli.quiet);
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins unless `--verbose`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config_or_exit(path: Option<&Path>, output: OutputFormat, quiet: bool) -> MatchConfig {
    match input::load_config(path) {
        Ok(config) => config,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

// ── match ───────────────────────────────────────────────────────────

fn cmd_match(
    v1_path: &Path,
    v2_path: &Path,
    config: &MatchConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let (v1, v2) = match (input::load_api_model(v1_path), input::load_api_model(v2_path)) {
        (Ok(v1), Ok(v2)) => (v1, v2),
        (Err(msg), _) | (_, Err(msg)) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let matcher = match Matcher::new(config) {
        Ok(m) => m,
        Err(e) => {
            report_error(&format!("invalid matcher configuration: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let correspondences = matcher.match_models(&v1, &v2);

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&correspondences.to_json())
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if !quiet {
                println!("{}", correspondences.to_text());
            }
        }
    }
}

// ── check ───────────────────────────────────────────────────────────

fn cmd_check(api_path: &Path, store_path: &Path, output: OutputFormat, quiet: bool) {
    let model = match input::load_api_model(api_path) {
        Ok(m) => m,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let store = match input::load_annotation_store(store_path) {
        Ok(s) => s,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let issues = check_store(&store, &model);

    match output {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "valid": issues.is_empty(),
                "annotations": store.len(),
                "issues": &issues,
            });
            let json = serde_json::to_string_pretty(&result)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if !quiet {
                if issues.is_empty() {
                    println!(
                        "{} annotation(s) on {} target(s): ok",
                        store.len(),
                        store.target_count()
                    );
                } else {
                    for issue in &issues {
                        println!("{}", issue);
                    }
                    println!();
                    println!("{} issue(s) found", issues.len());
                }
            }
        }
    }

    if !issues.is_empty() {
        process::exit(1);
    }
}

/// Report an error message respecting output format and quiet mode.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
