//! Configuration validation
//!
//! Rules:
//! - field ranges declared on the blueprint types (`validator` derive)
//! - file kinds carry a non-blank directory
//! - file_prefix contains no path separators
//! - no sink slot is registered twice

use std::collections::HashSet;

use contracts::{ContractError, LoggingBlueprint};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a LoggingBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &LoggingBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| first_violation("", &errors))?;
    validate_directories(blueprint)?;
    validate_file_prefixes(blueprint)?;
    validate_unique_slots(blueprint)?;
    Ok(())
}

/// Flatten derive errors into a single dotted field path
fn first_violation(prefix: &str, errors: &ValidationErrors) -> ContractError {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by_key(|(name, _)| name.to_string());

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("violates '{}' constraint", err.code));
                    return ContractError::config_validation(path, message);
                }
            }
            ValidationErrorsKind::Struct(inner) => return first_violation(&path, inner),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, inner)) = items.iter().next() {
                    return first_violation(&format!("{path}[{idx}]"), inner);
                }
            }
        }
    }
    ContractError::config_validation(prefix, "invalid value")
}

fn validate_directories(blueprint: &LoggingBlueprint) -> Result<(), ContractError> {
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if !sink.kind.needs_directory() {
            continue;
        }
        let blank = sink
            .directory
            .as_ref()
            .map_or(true, |dir| dir.as_os_str().to_string_lossy().trim().is_empty());
        if blank {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].directory"),
                "directory is required for file output",
            ));
        }
    }
    Ok(())
}

fn validate_file_prefixes(blueprint: &LoggingBlueprint) -> Result<(), ContractError> {
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.file_prefix.contains(['/', '\\']) {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].file_prefix"),
                format!("'{}' must not contain path separators", sink.file_prefix),
            ));
        }
    }
    Ok(())
}

fn validate_unique_slots(blueprint: &LoggingBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        for slot in sink.kind.slots() {
            if !seen.insert(*slot) {
                return Err(ContractError::config_validation(
                    format!("sinks[{idx}].kind"),
                    format!("duplicate {slot} sink"),
                ));
            }
        }
    }
    Ok(())
}
