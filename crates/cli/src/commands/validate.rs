//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{LoggingBlueprint, SinkKind};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    min_level: String,
    queue_capacity: usize,
    enqueue_timeout_ms: u64,
    flush_timeout_ms: u64,
    sinks: Vec<SinkSummary>,
}

#[derive(Serialize)]
struct SinkSummary {
    kind: SinkKind,
    min_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    directory: Option<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(summarize(&blueprint)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(blueprint: &LoggingBlueprint) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        min_level: blueprint.min_level.to_string(),
        queue_capacity: blueprint.queue.capacity,
        enqueue_timeout_ms: blueprint.queue.enqueue_timeout_ms,
        flush_timeout_ms: blueprint.queue.flush_timeout_ms,
        sinks: blueprint
            .sinks
            .iter()
            .map(|sink| SinkSummary {
                kind: sink.kind,
                min_level: sink.effective_level(blueprint.min_level).to_string(),
                directory: sink.directory.as_ref().map(|d| d.display().to_string()),
            })
            .collect(),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &LoggingBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - every entry will be discarded".to_string());
    }

    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if let Some(level) = sink.min_level {
            if level < blueprint.min_level {
                warnings.push(format!(
                    "sinks[{idx}].min_level {level} is below the global level {} and has no effect",
                    blueprint.min_level
                ));
            }
        }
    }

    if blueprint.queue.enqueue_timeout_ms > blueprint.queue.flush_timeout_ms {
        warnings.push(
            "queue.enqueue_timeout_ms exceeds flush_timeout_ms - producers may outwait shutdown"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Min level: {}", summary.min_level);
            println!(
                "  Queue: capacity={}, enqueue_timeout={}ms, flush_timeout={}ms",
                summary.queue_capacity, summary.enqueue_timeout_ms, summary.flush_timeout_ms
            );
            println!("  Sinks ({}):", summary.sinks.len());
            for sink in &summary.sinks {
                match sink.directory {
                    Some(ref dir) => println!("    - {:?} [{}] -> {dir}", sink.kind, sink.min_level),
                    None => println!("    - {:?} [{}]", sink.kind, sink.min_level),
                }
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}
