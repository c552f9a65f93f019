//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::Config;
use crate::foraging;
use curricula_core::{
    Curriculum, CurriculumError, Metrics, RuleRegistry, curriculum_from_slice, curriculum_to_json,
    curriculum_to_json_pretty, document_checksum, document_hash,
};
use std::path::{Path, PathBuf};

/// Maximum size of a metrics snapshot file (1 MB).
const MAX_METRICS_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CurriculumError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CurriculumError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CurriculumError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and check that it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CurriculumError> {
    let canonical = path.canonicalize().map_err(|e| {
        CurriculumError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CurriculumError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path against its canonical parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, CurriculumError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        CurriculumError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(CurriculumError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| CurriculumError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a file after path and size checks.
fn read_checked(path: &Path, max_size: u64) -> Result<Vec<u8>, CurriculumError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;

    std::fs::read(&validated)
        .map_err(|e| CurriculumError::IoError(format!("Read file: {}", e)))
}

/// Load a curriculum document, resolving rules against the process-wide registry.
pub fn load_curriculum(path: &Path, config: &Config) -> Result<Curriculum, CurriculumError> {
    let data = read_checked(path, config.document.max_size_bytes)?;
    let curriculum = curriculum_from_slice(&data, RuleRegistry::global())?;

    tracing::info!(
        "Loaded curriculum '{}' ({} stages) from {:?}",
        curriculum.name(),
        curriculum.len(),
        path
    );
    Ok(curriculum)
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// DEMO COMMAND
// =============================================================================

/// Write the bundled dynamic-foraging curriculum.
pub fn cmd_demo(output: &Path, config: &Config, json_mode: bool) -> Result<(), CurriculumError> {
    let validated_output = validate_output_path(output)?;

    let curriculum = foraging::major_in_dynamic_foraging(
        RuleRegistry::global(),
        config.curriculum.duplicate_policy,
    )?;

    let data = if config.document.pretty {
        curriculum_to_json_pretty(&curriculum)?
    } else {
        curriculum_to_json(&curriculum)?
    };
    let checksum = document_checksum(&curriculum)?;

    std::fs::write(&validated_output, data.as_bytes())
        .map_err(|e| CurriculumError::IoError(format!("Write file: {}", e)))?;

    if json_mode {
        print_json(&serde_json::json!({
            "output": validated_output.to_string_lossy(),
            "bytes": data.len(),
            "stages": curriculum.len(),
            "checksum": format!("{:016x}", checksum)
        }));
        return Ok(());
    }

    println!("Wrote {} bytes to {:?}", data.len(), validated_output);
    println!("Checksum: {:016x}", checksum);
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Parse, resolve and link a document; report what it contains.
pub fn cmd_validate(file: &Path, config: &Config, json_mode: bool) -> Result<(), CurriculumError> {
    let curriculum = load_curriculum(file, config)?;

    let edges = curriculum.edges();
    let mut rules: Vec<&str> = edges.iter().map(|edge| edge.rule.as_str()).collect();
    rules.sort_unstable();
    rules.dedup();

    if json_mode {
        print_json(&serde_json::json!({
            "valid": true,
            "name": curriculum.name(),
            "version": curriculum.version(),
            "schema_version": curriculum.schema_version(),
            "stages": curriculum.len(),
            "transitions": edges.len(),
            "rules": rules
        }));
        return Ok(());
    }

    println!("Curriculum '{}' is valid", curriculum.name());
    println!("Stages:      {}", curriculum.len());
    println!("Transitions: {}", edges.len());
    println!("Rules:");
    for rule in rules {
        println!("  {}", rule);
    }
    Ok(())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Print stages and their ordered transitions.
pub fn cmd_inspect(
    file: &Path,
    config: &Config,
    json_mode: bool,
    verbose: bool,
) -> Result<(), CurriculumError> {
    let curriculum = load_curriculum(file, config)?;

    if json_mode {
        let stages: Vec<_> = curriculum
            .stages()
            .map(|stage| {
                serde_json::json!({
                    "name": stage.name(),
                    "description": stage.description(),
                    "task": stage.task().name(),
                    "metrics": stage.metrics().name(),
                    "transitions": stage.transitions().iter().map(|t| serde_json::json!({
                        "target": t.target_stage().name(),
                        "rule": t.rule().name().as_str(),
                        "description": t.description()
                    })).collect::<Vec<_>>()
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "name": curriculum.name(),
            "description": curriculum.description(),
            "stages": stages
        }));
        return Ok(());
    }

    println!("Curriculum: {}", curriculum.name());
    if !curriculum.description().is_empty() {
        println!("{}", curriculum.description());
    }

    for stage in curriculum.stages() {
        println!();
        println!(
            "[{}] task={} metrics={}",
            stage.name(),
            stage.task().name(),
            stage.metrics().name()
        );
        if verbose {
            for (key, value) in stage.task().params() {
                println!("    param  {} = {}", key, value);
            }
            for (key, value) in stage.metrics().outputs() {
                println!("    output {} = {}", key, value);
            }
        }
        if stage.transitions().is_empty() {
            println!("  (terminal)");
        }
        for (index, transition) in stage.transitions().iter().enumerate() {
            println!(
                "  {}. -> {:<12} if {}  {}",
                index,
                transition.target_stage().name(),
                transition.rule().name(),
                transition.description()
            );
        }
    }
    Ok(())
}

// =============================================================================
// DECIDE COMMAND
// =============================================================================

/// Evaluate one stage's transitions against a metrics snapshot.
pub fn cmd_decide(
    file: &Path,
    stage: &str,
    metrics_path: &Path,
    config: &Config,
    json_mode: bool,
) -> Result<(), CurriculumError> {
    let curriculum = load_curriculum(file, config)?;

    let data = read_checked(metrics_path, MAX_METRICS_FILE_SIZE)?;
    let metrics: Metrics = serde_json::from_slice(&data)
        .map_err(|e| CurriculumError::DeserializationError(e.to_string()))?;
    metrics.validate()?;

    let decision = curriculum.decide(stage, &metrics)?;
    tracing::debug!(
        "Decision for stage '{}': {:?}",
        stage,
        decision.map(|d| d.target.name())
    );

    if json_mode {
        print_json(&serde_json::json!({
            "stage": stage,
            "fired": decision.is_some(),
            "index": decision.map(|d| d.index),
            "target": decision.map(|d| d.target.name()),
            "rule": decision.map(|d| d.transition.rule().name().as_str())
        }));
        return Ok(());
    }

    match decision {
        Some(decision) => println!(
            "{} -> {} (transition {}, {})",
            stage,
            decision.target.name(),
            decision.index,
            decision.transition.rule().name()
        ),
        None => println!("{}: no transition fires", stage),
    }
    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the document fingerprints.
pub fn cmd_hash(file: &Path, config: &Config, json_mode: bool) -> Result<(), CurriculumError> {
    let curriculum = load_curriculum(file, config)?;
    let checksum = document_checksum(&curriculum)?;
    let hash = document_hash(&curriculum)?;

    if json_mode {
        print_json(&serde_json::json!({
            "checksum": format!("{:016x}", checksum),
            "blake3": hash,
            "stages": curriculum.len()
        }));
        return Ok(());
    }

    println!("Checksum: {:016x}", checksum);
    println!("BLAKE3:   {}", hash);
    Ok(())
}

// =============================================================================
// RULES COMMAND
// =============================================================================

/// List every registered rule symbol.
pub fn cmd_rules(json_mode: bool) -> Result<(), CurriculumError> {
    let symbols = RuleRegistry::global().symbols()?;

    if json_mode {
        print_json(&serde_json::json!({ "rules": symbols }));
        return Ok(());
    }

    println!("Registered rules ({}):", symbols.len());
    for symbol in symbols {
        println!("  {}", symbol);
    }
    Ok(())
}
