use anyhow::Result;
use clap::Args;
use colored::Colorize;
use minibind_runtime::config::DEFAULT_CONFIG_NAME;
use minibind_runtime::RuntimeConfig;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory for durable `$` variables
    #[arg(short, long)]
    pub storage_dir: Option<PathBuf>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = RuntimeConfig {
        storage_dir: args.storage_dir,
        ..RuntimeConfig::default()
    };
    if let Some(dir) = &config.storage_dir {
        let dir = cwd.join(dir);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            println!("  {} Created {}/", "✓".green(), dir.display());
        }
    }

    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    Ok(())
}
