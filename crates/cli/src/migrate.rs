//! CLI migrate subcommand.
//!
//! Orchestrates the full pipeline:
//! load + schema-check inputs -> match -> migrate -> write outputs.
//!
//! All inputs are loaded and validated before matching starts; outputs are
//! written only once the run has completed, so a failed run leaves the
//! output directory untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use apishift_core::{run, MatchConfig, MigrationReport};
use apishift_interchange::annotation_store_to_json;

use crate::{input, report_error, OutputFormat};

pub(crate) const REPORT_FILE: &str = "migration_report.json";

/// File name of the migrated store for API version `version`. Versions that
/// would name a path outside the output directory are refused.
pub(crate) fn migrated_store_file(version: &str) -> Result<String, String> {
    let unsafe_char = |c: char| c == '/' || c == '\\' || c.is_control();
    if version.is_empty() || version.chars().any(unsafe_char) {
        return Err(format!(
            "API version '{}' cannot be used in an output file name",
            version.escape_debug()
        ));
    }
    Ok(format!("migrated_annotations_v{}.json", version))
}

/// Run the migration pipeline and write its outputs under `out_dir`.
pub fn cmd_migrate(
    v1_path: &Path,
    v2_path: &Path,
    store_path: &Path,
    out_dir: &Path,
    config: &MatchConfig,
    output: OutputFormat,
    quiet: bool,
) {
    // 1. Load everything up front
    let v1 = load_or_exit(input::load_api_model(v1_path), output, quiet);
    let v2 = load_or_exit(input::load_api_model(v2_path), output, quiet);
    let store_name = load_or_exit(migrated_store_file(v2.version()), output, quiet);
    let store = load_or_exit(input::load_annotation_store(store_path), output, quiet);

    // 2. Match and migrate
    let outcome = match run(&v1, &v2, &store, config) {
        Ok(o) => o,
        Err(e) => {
            report_error(&format!("invalid matcher configuration: {}", e), output, quiet);
            process::exit(1);
        }
    };

    // 3. Write outputs
    let store_file = out_dir.join(store_name);
    let report_file = out_dir.join(REPORT_FILE);
    if let Err(msg) = write_outputs(
        out_dir,
        &[
            (store_file.clone(), annotation_store_to_json(&outcome.store)),
            (report_file.clone(), outcome.report.to_json()),
        ],
    ) {
        report_error(&msg, output, quiet);
        process::exit(1);
    }

    // 4. Display
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&outcome.report.to_json())
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if !quiet {
                display_summary(&outcome.report, &store_file, &report_file);
            }
        }
    }
}

fn load_or_exit<T>(result: Result<T, String>, output: OutputFormat, quiet: bool) -> T {
    match result {
        Ok(value) => value,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn write_outputs(out_dir: &Path, files: &[(PathBuf, serde_json::Value)]) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|e| format!("could not create '{}': {}", out_dir.display(), e))?;
    for (path, doc) in files {
        let text = serde_json::to_string_pretty(doc)
            .map_err(|e| format!("could not serialize '{}': {}", path.display(), e))?;
        fs::write(path, text + "\n")
            .map_err(|e| format!("could not write '{}': {}", path.display(), e))?;
        tracing::debug!(path = %path.display(), "wrote output");
    }
    Ok(())
}

fn display_summary(report: &MigrationReport, store_file: &Path, report_file: &Path) {
    println!("{}", report.to_text());
    println!();
    println!("Wrote {}", store_file.display());
    println!("Wrote {}", report_file.display());
}
