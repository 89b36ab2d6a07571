//! hgmerge CLI - Command line interface for hgmerge
//!
//! Clone Mercurial repositories, or merge several into one.

mod commands;

use clap::{Parser, Subcommand};
use hgmerge_core::{Config, Hg, Repository};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{CloneArgs, GitifyArgs};

/// hgmerge: clone and combine Mercurial repositories
#[derive(Parser, Debug)]
#[command(name = "hgmerge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to hg executable (overrides config and env)
    #[arg(long, global = true, env = "HGMERGE_HG_PATH")]
    hg_path: Option<String>,

    /// Python interpreter for hg extensions (overrides config and env)
    #[arg(long, global = true, env = "HGMERGE_PYTHON_PATH")]
    python_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show hgmerge and Mercurial versions
    Version,

    /// Clone a repository, or merge several into one
    #[command(visible_alias = "c")]
    Clone(CloneArgs),

    /// Create an empty repository
    Create {
        /// Directory for the new repository
        path: std::path::PathBuf,
    },

    /// Convert a Mercurial repository to git
    Gitify(GitifyArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.hg_path.clone(), cli.python_path.clone())?;

    if cli.verbose {
        tracing::info!(
            hg_path = %config.hg.hg_path,
            python_path = %config.hg.python_path,
            "Configuration loaded"
        );
    }

    let hg = Hg::new(config.clone());

    match cli.command {
        Some(Commands::Version) => {
            println!("hgmerge {}", env!("CARGO_PKG_VERSION"));
            let version = hg.version().await?;
            println!(
                "Mercurial {}",
                version.version.as_deref().unwrap_or("(unknown version)")
            );
        }
        Some(Commands::Clone(args)) => {
            args.execute(&hg, cli.verbose).await?;
        }
        Some(Commands::Create { path }) => {
            let repo = hg.create(path).await?;
            println!("Created repository at {}", repo.path().display());
        }
        Some(Commands::Gitify(args)) => {
            args.execute(&hg).await?;
        }
        Some(Commands::Config) => {
            println!("hgmerge Configuration");
            println!("=====================");
            println!();
            println!("Tools:");
            println!("  hg_path: {}", config.hg.hg_path);
            println!("  python_path: {}", config.hg.python_path);
            println!("  git_path: {}", config.hg.git_path);
            println!("  fast_export_path: {}", config.hg.fast_export_path);
            println!(
                "  username: {}",
                config.hg.username.as_deref().unwrap_or("(from hgrc)")
            );
            println!(
                "  timeout: {}",
                config
                    .hg
                    .timeout
                    .map(|t| format!("{:?}", t))
                    .unwrap_or_else(|| "(none)".to_string())
            );
            println!();
            println!("Clone Settings:");
            match config.clone.base_dir {
                Some(ref dir) => println!("  base_dir: {}", dir.display()),
                None => println!("  base_dir: (current directory)"),
            }
            println!();
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        None => {
            println!("hgmerge - Clone and combine Mercurial repositories");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
