use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use std::io;
use std::process;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use yabrc::cli::{Cli, Commands};
use yabrc::commands::{self, update::UpdateOptions, update::UpdateOutcome};
use yabrc::diff::{JsonReporter, LoggingReporter};
use yabrc::fs::OsFileSystem;
use yabrc::output::{self, Verbosity};

fn main() {
    match run() {
        Ok(true) => {}
        // differences were already reported
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

fn init_logging(debug: bool, quiet: bool) {
    let level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if debug {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .without_time()
                    .with_target(false)
                    .with_writer(io::stderr),
            )
            .init();
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    let machine_output = matches!(
        cli.command,
        Commands::Print { json: true, .. } | Commands::Compare { json: true, .. }
    );
    if machine_output {
        output::set_verbosity(Verbosity::Quiet);
    } else if cli.debug {
        output::set_verbosity(Verbosity::Verbose);
    }
    init_logging(cli.debug, machine_output);

    let fs = OsFileSystem;

    match cli.command {
        Commands::Update {
            config,
            fast,
            autosave,
            overwrite,
            old_ext,
        } => {
            let options = UpdateOptions {
                ext: cli.ext,
                old_ext,
                fast,
                autosave,
                overwrite,
            };
            let outcome =
                commands::update::execute(&fs, &config, &options, &mut output::confirm_stdin)?;
            if outcome == UpdateOutcome::Declined {
                output::info("nothing saved");
            }
        }
        Commands::Compare {
            config1,
            config2,
            ext2,
            ignore_missing,
            json,
        } => {
            let same = if json {
                let mut reporter = JsonReporter::default();
                let same = commands::compare::execute(
                    &fs,
                    &config1,
                    config2.as_deref(),
                    &cli.ext,
                    &ext2,
                    ignore_missing,
                    &mut reporter,
                )?;
                println!("{}", reporter.to_json()?);
                same
            } else {
                let mut reporter = LoggingReporter::new();
                commands::compare::execute(
                    &fs,
                    &config1,
                    config2.as_deref(),
                    &cli.ext,
                    &ext2,
                    ignore_missing,
                    &mut reporter,
                )?
            };

            if !same {
                return Ok(false);
            }
            output::success("no differences!");
        }
        Commands::Print {
            configs,
            entries,
            json,
        } => {
            commands::print::execute(&fs, &configs, &cli.ext, entries, json, &mut io::stdout())?;
        }
        Commands::Version => {
            commands::version::execute(&mut io::stdout())?;
        }
        Commands::Completion { shell } => {
            print_completions(shell, &mut Cli::command());
        }
    }

    Ok(true)
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
