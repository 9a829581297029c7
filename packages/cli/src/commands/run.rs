use crate::steps::{replay, Step};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use minibind_runtime::{BindingReport, Document, Fragment, Runtime, RuntimeConfig};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Document as a JSON array of fragments
    pub document: PathBuf,

    /// JSON array of steps to replay after binding
    #[arg(short, long)]
    pub steps: Option<PathBuf>,

    /// Config file (defaults to minibind.config.json in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Include global variables in the output
    #[arg(long)]
    pub variables: bool,
}

pub fn run(args: RunArgs, cwd: &Path) -> Result<()> {
    let config = match &args.config {
        Some(path) => RuntimeConfig::load_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RuntimeConfig::load(cwd)?,
    };

    let fragments: Vec<Fragment> = read_json(&args.document)?;
    let steps: Vec<Step> = match &args.steps {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let output = execute(&fragments, &steps, config, args.variables)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Bind the document, replay the steps and describe the final tree
pub fn execute(
    fragments: &[Fragment],
    steps: &[Step],
    config: RuntimeConfig,
    include_variables: bool,
) -> Result<serde_json::Value> {
    let mut rt = Runtime::new(Document::from_fragments(fragments), config);

    let mut report = rt.start();
    report.merge(replay(&mut rt, steps)?);
    print_failures(&report);

    let root = rt.document().root();
    let mut output = json!({ "document": rt.document().snapshot_children(root) });
    if include_variables {
        let variables: serde_json::Map<String, serde_json::Value> = rt
            .globals()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        output["variables"] = serde_json::Value::Object(variables);
    }
    Ok(output)
}

fn print_failures(report: &BindingReport) {
    for failure in &report.failures {
        eprintln!(
            "{} {} {}: {}",
            "✗".red(),
            failure.entity,
            failure.attribute.bright_white(),
            failure.error
        );
    }
}
