use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use hybrid_directory::cli::{self, ListOptions};
use owo_colors::OwoColorize;
use std::path::Path;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Hybrid Directory: one directory tree over a local filesystem and a flat blob store
#[derive(Parser)]
#[command(name = "hdir", version, styles = STYLES)]
struct Cli {
    /// The hybrid configuration file
    #[arg(short, long, global = true, default_value = "hybrid.yml")]
    config: String,

    /// The dotenv file to source HYBRID_* overrides from, skipped when missing
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a directory exists in either backend
    Exists {
        /// Directory path, relative to the local root or absolute
        path: String,
    },

    /// Create a directory, writing a marker blob when it only lives in blob storage
    Mkdir { path: String },

    /// List files in a directory, or its subdirectories with --dirs
    Ls {
        /// Directory to list, defaults to the local root
        path: Option<String>,

        /// Glob pattern matched against entry names
        #[arg(short, long)]
        pattern: Option<String>,

        /// List subdirectories instead of files
        #[arg(short, long)]
        dirs: bool,

        /// Include subdirectories at every depth
        #[arg(short, long, requires = "dirs")]
        all_levels: bool,
    },

    /// Delete a directory
    Rm {
        path: String,

        /// Delete everything below the directory as well
        #[arg(short, long)]
        recursive: bool,
    },

    /// Move a directory tree or a single file
    Mv { source: String, dest: String },

    /// Show the attributes of a directory
    Info { path: String },

    /// Show where a path lives: canonical local path, container and blob key
    Key { path: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_loaded = match Path::new(&cli.env).exists() {
        true => {
            dotenvy::from_filename(&cli.env)?;
            true
        }
        false => false,
    };

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    if env_loaded {
        log::debug!("Sourced environment from {}", cli.env.bright_black());
    }

    let config = cli::load_config(&cli.config)?;

    match cli.command {
        Commands::Exists { path } => {
            let directories = cli::build_directories(&config);
            let exists = cli::check_exists(&directories, &path)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "path": directories.canonical(&path), "exists": exists })
                );
            } else {
                match exists {
                    true => println!("{} {}", "exists".green(), directories.canonical(&path)),
                    false => println!("{} {}", "missing".red(), directories.canonical(&path)),
                }
            }
        }
        Commands::Mkdir { path } => {
            let directories = cli::build_directories(&config);
            let snapshot = cli::make_directory(&directories, &path)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
        }
        Commands::Ls {
            path,
            pattern,
            dirs,
            all_levels,
        } => {
            let path = path.unwrap_or_else(|| config.local_root.clone());
            log::debug!(
                "Listing {} in {}",
                match dirs {
                    true => "directories",
                    false => "files",
                }
                .cyan(),
                path.bright_black()
            );
            let directories = cli::build_directories(&config);
            let options = ListOptions {
                pattern,
                directories: dirs,
                all_levels,
            };
            let entries = cli::list_entries(&directories, &path, &options)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    println!("{}", entry);
                }
            }
        }
        Commands::Rm { path, recursive } => {
            let directories = cli::build_directories(&config);
            let report = cli::remove_directory(&directories, &path, recursive)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for failure in &report.failures {
                    println!(
                        "{} {:?} {}: {}",
                        "failed".red(),
                        failure.target,
                        failure.location,
                        failure.message.bright_black()
                    );
                }
            }
        }
        Commands::Mv { source, dest } => {
            let directories = cli::build_directories(&config);
            let dest = cli::move_entry(&directories, &source, &dest)?;
            if cli.json {
                println!("{}", serde_json::json!({ "dest": dest }));
            }
        }
        Commands::Info { path } => {
            let directories = cli::build_directories(&config);
            let snapshot = cli::describe(&directories, &path)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!("{}  {}", "path".bright_white(), snapshot.full_name);
                println!("{}  {}", "name".bright_white(), snapshot.name);
                println!("{}  {}", "exists".bright_white(), snapshot.exists.cyan());
                println!(
                    "{}  {}",
                    "created".bright_white(),
                    format_time(snapshot.created).bright_black()
                );
                println!(
                    "{}  {}",
                    "modified".bright_white(),
                    format_time(snapshot.last_write).bright_black()
                );
            }
        }
        Commands::Key { path } => {
            let info = cli::locate_key(&config, &path);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}  {}", "local".bright_white(), info.local_path);
                println!("{}  {}", "container".bright_white(), info.container.cyan());
                println!("{}  {}", "key".bright_white(), info.key.green());
            }
        }
    }

    Ok(())
}

/// Seconds since the Unix epoch, or `-` when unknown
fn format_time(time: Option<std::time::SystemTime>) -> String {
    time.and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|| "-".to_string())
}
