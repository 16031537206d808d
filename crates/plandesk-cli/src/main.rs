// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use log::LevelFilter;
use plandesk_api::Client;
use plandesk_app::AppState;
use plandesk_testkit::MemoryDirectory;
use runtime::DirectoryRuntime;
use simplelog::WriteLogger;
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const DEMO_SEED: u64 = 7;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `plandesk --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let client = if options.demo {
        None
    } else {
        let client = Client::new(config.api_base_url(), config.api_timeout()?).with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
        Some(client)
    };

    if options.check_only {
        if let Some(client) = &client {
            client.ping()?;
        }
        return Ok(());
    }

    let log_path = match &options.log_path {
        Some(path) => path.clone(),
        None => config.log_path()?,
    };
    init_logging(&log_path, config.log_level()?)?;

    let mut state = AppState::new(config.start_kind()?, config.table_options());
    match client {
        Some(client) => {
            log::info!(
                "starting against {} (timeout {:?})",
                client.base_url(),
                client.timeout()
            );
            let mut runtime = DirectoryRuntime::new(client);
            plandesk_tui::run_app(&mut state, &mut runtime)
        }
        None => {
            log::info!("starting with demo data (seed {DEMO_SEED})");
            let mut runtime = DirectoryRuntime::new(MemoryDirectory::seeded(DEMO_SEED));
            plandesk_tui::run_app(&mut state, &mut runtime)
        }
    }
}

fn init_logging(path: &Path, level: LevelFilter) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let log_file =
        File::create(path).with_context(|| format!("create log file {}", path.display()))?;
    WriteLogger::init(level, simplelog::Config::default(), log_file)
        .with_context(|| format!("initialize logger at {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    log_path: Option<PathBuf>,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        log_path: None,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--log" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--log requires a file path"))?;
                options.log_path = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("plandesk: admin console for organizations, users, plans and access requests");
    println!("  --config <path>          Use a specific config path");
    println!("  --log <path>             Write the log to this file");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch against seeded in-memory data");
    println!("  --check                  Validate config and reach the backend, then exit");
    println!("  --help                   Show this help");
}
