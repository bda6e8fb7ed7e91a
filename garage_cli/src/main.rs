#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `garage`: host binary for the garage door engine.

mod backend;
mod cli;
mod error_fmt;
mod serve;

use std::io::BufRead;

use clap::Parser;
use eyre::WrapErr;
use garage_config::Logging;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::serve::Msg;

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = garage_config::load_file(&cli.config)?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {:?}", cli.config))?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "config loaded");

    match cli.cmd {
        Commands::SelfCheck => {
            let (door, _sims) = backend::build_door(&cfg, None)?;
            let status = door.status()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "name": door.name(),
                        "current": status.current.to_string(),
                        "target": status.target.to_string(),
                        "wired_sensors": cfg.wired_sensors(),
                    })
                );
            } else {
                println!("ok: {} {}", door.name(), status.summary());
            }
            Ok(())
        }
        Commands::Run => run(&cfg, cli.json),
    }
}

fn run(cfg: &garage_config::Config, json_mode: bool) -> eyre::Result<()> {
    let (tx, rx) = crossbeam_channel::unbounded::<Msg>();

    let sig = tx.clone();
    ctrlc::set_handler(move || {
        let _ = sig.send(Msg::Shutdown);
    })
    .wrap_err("install Ctrl-C handler")?;

    let (mut door, sims) = backend::build_door(cfg, Some(tx.clone()))?;
    serve::print_events(&mut door, json_mode);

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if tx.send(Msg::Line(l)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
        let _ = tx.send(Msg::Shutdown);
    });

    serve::serve(&mut door, &sims, &rx, json_mode)
}

fn init_tracing(json: bool, cli_level: Option<&str>, logging: &Logging) -> eyre::Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info")
        .to_string();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Console logs go to stderr; stdout carries events and status lines.
    let (pretty, structured) = if json {
        (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        )
    } else {
        (
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
            None,
        )
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {path:?} has no file name"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(structured)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("init logging: {e}"))
}
