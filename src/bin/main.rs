use clap::{Parser, Subcommand};
use project_service::config::{CONFIG_FILE_NAME, load_config};
use project_service::{OsFileSystem, ProjectKind, ProjectRegistry, RegistryDriver};
use std::path::PathBuf;
use std::sync::Arc;

/// Project membership service for a multi-file editor
#[derive(Parser)]
#[command(name = "project-service")]
#[command(version)]
#[command(about = "Resolve which project owns each open file")]
struct Cli {
    /// Config file (default: ./project-service.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory relative paths are resolved against
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open files as an editor would and print the resulting projects
    Inspect {
        /// Files to open, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let outcome = load_config(&config_path);
    for event in &outcome.events {
        event.log();
    }

    let mut builder =
        ProjectRegistry::builder(Arc::new(OsFileSystem::new())).config(outcome.config);
    if let Some(base_dir) = cli.base_dir {
        builder = builder.base_dir(base_dir);
    }
    let registry = match builder.build() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Inspect { files } => {
            let handle = RegistryDriver::new(registry).spawn();
            let shared = handle.registry();
            let mut registry = shared.lock().await;

            let mut failed = false;
            for file in &files {
                if let Err(e) = registry.open_file(file, None) {
                    eprintln!("Error: {}", e);
                    failed = true;
                }
            }
            registry.flush_timers();

            for project in registry.projects() {
                match project.kind() {
                    ProjectKind::Inferred => println!("{} (inferred)", project.id()),
                    ProjectKind::Configured { manifest } => {
                        println!("{} ({})", project.id(), manifest.display())
                    }
                }
                println!("  open files: {}", project.open_refs());
                for file in project.files() {
                    let marker = if project.is_root(file) { "root" } else { "ref " };
                    println!("  {} {}", marker, file.display());
                }
            }
            drop(registry);
            handle.shutdown().await;

            if failed {
                std::process::exit(1);
            }
        }
    }
}
