mod tui;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};

use launchdeck::logging::{self, LogSink};
use launchdeck::paths::AppPaths;
use launchdeck::{
    derive_name, Browser, Launcher, Platform, TagMatch, TargetDraft, TargetKind,
};

#[derive(Parser, Debug)]
#[command(name = "launchdeck", version, about = "Register programs and URLs, then launch them")]
struct Cli {
    /// Directory holding registry.json and the log file
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG (e.g. `debug`, `launchdeck=trace`)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered targets
    List {
        #[arg(long)]
        json: bool,
        /// Only targets carrying this tag; repeatable
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Require every --tag instead of any
        #[arg(long, requires = "tags")]
        all_tags: bool,
    },
    /// Launch targets by id
    Launch {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Open several URLs in one browser invocation
    Open {
        #[arg(long, default_value = "edge")]
        browser: Browser,
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Register a new target
    Add(AddArgs),
    /// Remove a target by id
    Remove { id: String },
    /// Declare a category
    Category { name: String },
    /// Print all categories, `all` first
    Categories,
    /// Print every tag in use
    Tags,
    /// List registry snapshots, newest first
    History,
    /// Replace the registry with a snapshot from `history`
    Restore { snapshot: String },
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Display name; derived from --path when omitted
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value = "")]
    category: String,
    /// Executable to run
    #[arg(long, conflicts_with = "url")]
    path: Option<String>,
    /// Raw argument string, appended to the command line as typed
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    args: String,
    /// URL to open in a browser
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    browser: Option<Browser>,
    /// Tag to attach; repeatable
    #[arg(long = "tag", value_name = "TAG")]
    tags: Vec<String>,
}

impl AddArgs {
    fn into_draft(self) -> TargetDraft {
        let kind = if self.url.is_some() {
            TargetKind::Browser
        } else {
            TargetKind::Software
        };
        let path = self.path.unwrap_or_default();
        let name = self
            .name
            .unwrap_or_else(|| match kind {
                TargetKind::Software if !path.trim().is_empty() => {
                    derive_name(&path, Platform::current().executable_extension())
                }
                _ => String::new(),
            });
        TargetDraft {
            name,
            kind,
            category: self.category,
            path,
            args: self.args,
            browser: self.browser,
            url: self.url.unwrap_or_default(),
            tags: self.tags,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let paths = AppPaths::new(cli.data_dir)?;
    let sink = match cli.command {
        None => LogSink::File(paths.log_file()),
        Some(_) => LogSink::Stderr,
    };
    logging::init(cli.log_level.as_deref(), sink)?;

    let mut launcher = Launcher::open(&paths)
        .with_context(|| format!("Unable to open registry {}", paths.registry_file().display()))?;

    let Some(command) = cli.command else {
        tui::run(launcher)?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::List {
            json,
            tags,
            all_tags,
        } => {
            let mode = if all_tags { TagMatch::All } else { TagMatch::Any };
            let targets = launcher.targets_tagged(&tags, mode);
            if json {
                println!("{}", serde_json::to_string_pretty(&targets)?);
            } else if targets.is_empty() {
                println!(
                    "No launch targets registered in {}.",
                    launcher.registry().path().display()
                );
            } else {
                for target in &targets {
                    println!(
                        "{}  {:<16} {:<24} {}",
                        target.id,
                        target.category,
                        target.name,
                        target.summary()
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Launch { ids } => {
            let mut all_ok = true;
            for id in &ids {
                match launcher.target(id) {
                    Some(target) if launcher.dispatch(target) => {
                        println!("Launched {}", target.name);
                    }
                    Some(target) => {
                        eprintln!("Launch failed: {}", target.name);
                        all_ok = false;
                    }
                    None => {
                        eprintln!("No target with id {id}");
                        all_ok = false;
                    }
                }
            }
            Ok(exit_code(all_ok))
        }
        Commands::Open { browser, urls } => {
            let opened = launcher.open_urls(browser, &urls);
            if !opened {
                eprintln!("Launch failed: {browser}");
            }
            Ok(exit_code(opened))
        }
        Commands::Add(args) => {
            let draft = args.into_draft();
            let targets = launcher.add_target(&draft)?;
            if let Some(target) = targets.last() {
                println!("Added {} ({})", target.name, target.id);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Remove { id } => {
            let before = launcher.list_targets().len();
            let after = launcher.remove_target(&id)?.len();
            if after == before {
                println!("No target with id {id}");
            } else {
                println!("Removed {id}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Category { name } => {
            launcher.add_category(&name)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Categories => {
            for name in launcher.categories() {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Tags => {
            for tag in launcher.tags() {
                println!("{tag}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::History => {
            let entries = launcher.history()?;
            if entries.is_empty() {
                println!("No registry snapshots yet.");
            }
            for entry in entries {
                println!(
                    "{}  {}  {}",
                    entry.name,
                    entry.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                    entry.description
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Restore { snapshot } => {
            let targets = launcher.restore(&snapshot)?;
            println!("Restored {snapshot} ({} targets)", targets.len());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
