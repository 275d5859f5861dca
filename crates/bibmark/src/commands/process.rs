/*
 * process.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Process command implementation
 */

//! Process command implementation.
//!
//! Drives documents through one `CitationProcessor` in argument order, so
//! bibliography numbering stays stable across the whole run. Outputs go to
//! `--output-dir` under the input's file name, or to stdout when no output
//! directory is given.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use bibmark_core::{CitationConfig, CitationProcessor};

/// Arguments for the process command
#[derive(Debug, Default)]
pub struct ProcessArgs {
    /// Input files, processed in order
    pub inputs: Vec<String>,
    /// Bibliography file path
    pub bib_file: Option<String>,
    /// Bibliography directory path
    pub bib_dir: Option<String>,
    /// Local bibliography placeholder token
    pub bib_command: Option<String>,
    /// Full bibliography placeholder token
    pub full_bib_command: Option<String>,
    /// CSL style file path
    pub style: Option<String>,
    /// Style processor binary
    pub style_processor: Option<String>,
    /// YAML configuration file path
    pub config: Option<String>,
    /// Output directory
    pub output_dir: Option<String>,
    /// Suppress console output
    pub quiet: bool,
}

/// Execute the process command
pub fn execute(args: ProcessArgs) -> Result<()> {
    let config = build_config(&args)?;
    let mut processor =
        CitationProcessor::new(&config).context("Failed to initialize citation processor")?;

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory '{}'", dir))?;
    }

    for input in &args.inputs {
        let input_path = PathBuf::from(input);
        let text = fs::read_to_string(&input_path)
            .with_context(|| format!("Failed to read input '{}'", input_path.display()))?;

        info!(input = %input_path.display(), "Processing document");
        let rewritten = processor
            .process_document(&text)
            .with_context(|| format!("Failed to process '{}'", input_path.display()))?;

        match &args.output_dir {
            Some(dir) => {
                let out_path = output_path(dir, &input_path)?;
                fs::write(&out_path, rewritten)
                    .with_context(|| format!("Failed to write '{}'", out_path.display()))?;
                if !args.quiet {
                    println!("{} -> {}", input_path.display(), out_path.display());
                }
            }
            None => print!("{}", rewritten),
        }
    }

    Ok(())
}

/// Build the run configuration: config file first, then flag overrides.
fn build_config(args: &ProcessArgs) -> Result<CitationConfig> {
    let mut config = match &args.config {
        Some(path) => CitationConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load configuration '{}'", path))?,
        None => CitationConfig::default(),
    };

    if let Some(bib_file) = &args.bib_file {
        config.bib_file = Some(PathBuf::from(bib_file));
    }
    if let Some(bib_dir) = &args.bib_dir {
        config.bib_dir = Some(PathBuf::from(bib_dir));
    }
    if let Some(bib_command) = &args.bib_command {
        config.bib_command = bib_command.clone();
    }
    if let Some(full_bib_command) = &args.full_bib_command {
        config.full_bib_command = full_bib_command.clone();
    }
    if let Some(style) = &args.style {
        config.style_file = Some(PathBuf::from(style));
    }
    if let Some(style_processor) = &args.style_processor {
        config.style_processor = Some(PathBuf::from(style_processor));
    }

    Ok(config)
}

fn output_path(dir: &str, input: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .with_context(|| format!("Input '{}' has no file name", input.display()))?;
    Ok(Path::new(dir).join(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("bibmark.yml");
        fs::write(
            &config_path,
            "bib_file: from-config.json\nbib_command: \"\\\\refs\"\n",
        )
        .unwrap();

        let args = ProcessArgs {
            config: Some(config_path.display().to_string()),
            bib_file: Some("from-flag.json".to_string()),
            ..Default::default()
        };
        let config = build_config(&args).unwrap();

        assert_eq!(config.bib_file, Some(PathBuf::from("from-flag.json")));
        // Values without a flag keep the config-file setting.
        assert_eq!(config.bib_command, "\\refs");
    }

    #[test]
    fn test_output_path_keeps_file_name() {
        let out = output_path("out", Path::new("docs/page.md")).unwrap();
        assert_eq!(out, PathBuf::from("out/page.md"));
    }

    #[test]
    fn test_execute_writes_outputs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let bib_path = dir.path().join("refs.json");
        fs::write(
            &bib_path,
            r#"[{"id": "PM18", "type": "book", "title": "The Book of Why"},
               {"id": "Hamilton", "type": "book", "title": "Time Series Analysis"}]"#,
        )
        .unwrap();

        let first = dir.path().join("first.md");
        fs::write(&first, "One [@PM18]\n\n\\bibliography\n").unwrap();
        let second = dir.path().join("second.md");
        fs::write(&second, "Two [@Hamilton]\n\n\\bibliography\n").unwrap();

        let out_dir = dir.path().join("out");
        execute(ProcessArgs {
            inputs: vec![
                first.display().to_string(),
                second.display().to_string(),
            ],
            bib_file: Some(bib_path.display().to_string()),
            output_dir: Some(out_dir.display().to_string()),
            quiet: true,
            ..Default::default()
        })
        .unwrap();

        let first_out = fs::read_to_string(out_dir.join("first.md")).unwrap();
        assert!(first_out.contains("[^1]"), "Got: {}", first_out);

        // Numbering continues across documents.
        let second_out = fs::read_to_string(out_dir.join("second.md")).unwrap();
        assert!(second_out.contains("[^2]"), "Got: {}", second_out);
        assert!(second_out.contains("[^2]:"), "Got: {}", second_out);
    }

    #[test]
    fn test_execute_without_bibliography_fails() {
        let result = execute(ProcessArgs::default());
        assert!(result.is_err());
    }
}
