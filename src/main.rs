//! regtest-collector CLI - Discover legacy regression tests and rebuild their commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use regtest_collector::command::CommandOptions;
use regtest_collector::config::{self, Config, StrategyConfig};
use regtest_collector::coordinator::CollectionCoordinator;
use regtest_collector::filter::{TestFilter, group_choices};
use regtest_collector::model::{CollectionResult, DiscoveredTest};
use regtest_collector::report::{self, ProgressDisplay};
use regtest_collector::script;
use regtest_collector::strategy::{
    CollectionStrategy, DelegatedStrategy, InProcessStrategy, ProgressCallback,
};

#[derive(Parser)]
#[command(name = "regtest-collector")]
#[command(about = "Discover legacy regression tests and rebuild their commands", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults are used when it does not exist)
    #[arg(short, long, default_value = "regtest.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a discovery pass and save the results
    Collect {
        /// Scan this directory for launchers (in-process strategy)
        #[arg(long, conflicts_with = "script")]
        root: Option<PathBuf>,

        /// Parse the report of this orchestrator script (delegated strategy)
        #[arg(long)]
        script: Option<PathBuf>,

        /// Interpreter used to run scripts
        #[arg(short, long)]
        interpreter: Option<String>,

        /// Results file to write
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the tests of a saved result
    List {
        /// Results file to read
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Only show tests of this group (repeatable, "(All)" for every group)
        #[arg(short, long = "group")]
        groups: Vec<String>,

        /// Search terms; every term must match the name, group or command
        query: Vec<String>,
    },

    /// Print a reproduction command for one saved test
    Command {
        /// Test name
        name: String,

        /// Restrict the lookup to this group
        #[arg(short, long)]
        group: Option<String>,

        /// Results file to read
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Resolve the root relative to the executable's directory
        #[arg(long)]
        relative: bool,

        /// Produce a Linux command
        #[arg(long)]
        linux: bool,

        /// Drop the executable from the command
        #[arg(long)]
        no_exe: bool,

        /// Insert the executable's debug switch (-d)
        #[arg(long)]
        debug_flag: bool,

        /// Insert the executable's verbose switch (-v)
        #[arg(long)]
        verbose_flag: bool,
    },

    /// Write the debug variant of a test's validation script
    DebugCopy {
        /// Test name
        name: String,

        /// Restrict the lookup to this group
        #[arg(short, long)]
        group: Option<String>,

        /// Results file to read
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Delete the debug scripts written by debug-copy
    CleanDebug {
        /// Directory searched recursively (defaults to the configured root)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate,

    /// Initialize a new configuration file
    Init {
        /// Strategy type (in_process, delegated)
        #[arg(short, long, default_value = "in_process")]
        strategy: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Collect {
            root,
            script,
            interpreter,
            output,
            format,
        } => collect_tests(&cli.config, root, script, interpreter, output, &format).await,
        Commands::List {
            input,
            groups,
            query,
        } => list_tests(&cli.config, input, &groups, &query, cli.verbose),
        Commands::Command {
            name,
            group,
            input,
            relative,
            linux,
            no_exe,
            debug_flag,
            verbose_flag,
        } => {
            let options = CommandOptions {
                absolute: !relative,
                windows: !linux,
                include_exe: !no_exe,
                debug: debug_flag,
                verbose: verbose_flag,
            };
            print_command(&cli.config, input, &name, group.as_deref(), options)
        }
        Commands::DebugCopy { name, group, input } => {
            debug_copy(&cli.config, input, &name, group.as_deref()).await
        }
        Commands::CleanDebug { root } => clean_debug(&cli.config, root).await,
        Commands::Validate => validate_config(&cli.config),
        Commands::Init { strategy } => init_config(&cli.config, &strategy),
    }
}

async fn collect_tests(
    config_path: &Path,
    root: Option<PathBuf>,
    script: Option<PathBuf>,
    interpreter: Option<String>,
    output: Option<PathBuf>,
    format: &str,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(root) = root {
        config.strategy = StrategyConfig::InProcess { root };
    } else if let Some(script) = script {
        config.strategy = StrategyConfig::Delegated {
            script,
            markers: Default::default(),
            read_results_file: false,
        };
    }
    let interpreter = interpreter.unwrap_or_else(|| config.collector.interpreter.clone());
    let output = output.unwrap_or_else(|| config.report.output.clone());

    let display = if format == "json" {
        ProgressDisplay::hidden()
    } else {
        ProgressDisplay::new()
    };
    let coordinator = CollectionCoordinator::new(create_strategy(&config, display.callback()));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling collection");
            on_interrupt.cancel();
        }
    });

    let result = coordinator.collect(&interpreter, &cancel).await;
    display.finish();
    let result = result.context("Collection failed")?;

    report::save_result(&result, &output)?;
    info!("Saved results to {}", output.display());

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        _ => {
            println!("Discovered {} tests:", result.tests.len());
            report::print_tests(&result.tests, false);
            report::print_summary(&result);
        }
    }

    Ok(())
}

fn create_strategy(config: &Config, progress: ProgressCallback) -> Box<dyn CollectionStrategy> {
    let collector = &config.collector;
    match &config.strategy {
        StrategyConfig::InProcess { root } => Box::new(
            InProcessStrategy::new(root)
                .with_batch_pattern(&collector.batch_pattern)
                .with_script_pattern(&collector.script_pattern)
                .with_qualifier(&collector.qualifier)
                .with_transform(collector.transform.clone())
                .with_path_style(config.command.path_style)
                .with_timeout(collector.timeout())
                .with_progress_callback(progress),
        ),
        StrategyConfig::Delegated {
            script,
            markers,
            read_results_file,
        } => Box::new(
            DelegatedStrategy::new(script)
                .with_markers(markers.clone())
                .with_results_file(*read_results_file)
                .with_timeout(collector.timeout())
                .with_progress_callback(progress),
        ),
    }
}

fn load_saved(config: &Config, input: Option<PathBuf>) -> Result<CollectionResult> {
    let path = input.unwrap_or_else(|| config.report.output.clone());
    report::load_result(&path)
}

fn find_test<'a>(
    result: &'a CollectionResult,
    name: &str,
    group: Option<&str>,
) -> Result<&'a DiscoveredTest> {
    result.find(name, group).ok_or_else(|| match group {
        Some(group) => anyhow!("Test '{}' not found in group '{}'", name, group),
        None => anyhow!("Test '{}' not found", name),
    })
}

fn list_tests(
    config_path: &Path,
    input: Option<PathBuf>,
    groups: &[String],
    query: &[String],
    verbose: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let result = load_saved(&config, input)?;

    // Arguments with spaces were quoted phrases on the command line.
    let query: Vec<String> = query
        .iter()
        .map(|term| {
            if term.contains(char::is_whitespace) {
                format!("\"{}\"", term)
            } else {
                term.clone()
            }
        })
        .collect();
    let filter = TestFilter::new(&query.join(" ")).with_groups(groups.iter().cloned());
    let matching = filter.apply(&result.tests);

    println!("{} of {} tests:", matching.len(), result.tests.len());
    if matching.is_empty() && !filter.groups().is_empty() {
        println!("Groups: {}", group_choices(&result.tests).join(", "));
    }
    report::print_tests(matching, verbose);

    Ok(())
}

fn print_command(
    config_path: &Path,
    input: Option<PathBuf>,
    name: &str,
    group: Option<&str>,
    options: CommandOptions,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let result = load_saved(&config, input)?;
    let test = find_test(&result, name, group)?;

    let command = config.command.builder().build(test, options);
    if command.is_empty() {
        bail!("Nothing usable to build a command from for test '{}'", name);
    }
    println!("{}", command);

    Ok(())
}

async fn debug_copy(
    config_path: &Path,
    input: Option<PathBuf>,
    name: &str,
    group: Option<&str>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let result = load_saved(&config, input)?;
    let test = find_test(&result, name, group)?;

    let path = script::create_debug_copy(test, config.command.path_style)
        .await
        .with_context(|| format!("Failed to create debug copy for test '{}'", name))?;
    println!("{}", path.display());

    Ok(())
}

async fn clean_debug(config_path: &Path, root: Option<PathBuf>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let root = root.unwrap_or_else(|| match &config.strategy {
        StrategyConfig::InProcess { root } => root.clone(),
        StrategyConfig::Delegated { .. } => PathBuf::from("."),
    });

    let removed = script::remove_debug_copies(&root)
        .await
        .with_context(|| format!("Failed to clean debug scripts below {}", root.display()))?;
    for path in &removed {
        println!("  {}", path.display());
    }
    println!("Removed {} debug scripts", removed.len());

    Ok(())
}

fn validate_config(config_path: &Path) -> Result<()> {
    match config::load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("Settings:");
            println!("  Interpreter: {}", config.collector.interpreter);
            println!("  Launchers: {}", config.collector.batch_pattern);
            println!("  Scripts: {}", config.collector.script_pattern);
            match config.collector.timeout_secs {
                Some(secs) => println!("  Script timeout: {}s", secs),
                None => println!("  Script timeout: none"),
            }

            match &config.strategy {
                StrategyConfig::InProcess { root } => {
                    println!("  Strategy: in_process ({})", root.display())
                }
                StrategyConfig::Delegated { script, .. } => {
                    println!("  Strategy: delegated ({})", script.display())
                }
            }
            println!("  Results: {}", config.report.output.display());

            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_config(config_path: &Path, strategy: &str) -> Result<()> {
    let strategy_config = match strategy {
        "in_process" => {
            r#"[strategy]
type = "in_process"
# Directory searched recursively for RegressionTest*.bat launchers
root = ".""#
        }
        "delegated" => {
            r#"[strategy]
type = "delegated"
# Script that discovers the tests itself and prints a report
script = "collect_regtests.py"
# Read <stem>Results.txt instead of stdout
read_results_file = false"#
        }
        _ => {
            eprintln!("Unknown strategy: {}. Use: in_process, delegated", strategy);
            std::process::exit(1);
        }
    };

    let config = format!(
        r#"# regtest-collector configuration file

[collector]
interpreter = "python"
batch_pattern = "RegressionTest*.bat"
script_pattern = "RegTest*.py"
# timeout_secs = 120

{}

[command]
linux_home = "/home/user/.vs"

[report]
output = "regtest-results.json"
"#,
        strategy_config
    );

    if config_path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit manually.",
            config_path.display()
        );
        std::process::exit(1);
    }

    std::fs::write(config_path, config)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created {}", config_path.display());
    println!();
    println!("Edit the configuration as needed, then run:");
    println!("  regtest-collector collect");

    Ok(())
}
