/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::ceph_matrix::{self, CephMatrix};
use crate::cli::{Cli, Commands};
use crate::orchestrator::{BatchReport, Orchestrator};
use crate::output::Console;
use crate::registry::Registry;
use crate::reporting;
use crate::store::TableStore;
use crate::transport::http::ReqwestHttp;
use crate::transport::{HttpClient, Transports};
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use verwatch_utils::logging::prelude::*;
use verwatch_utils::Settings;

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Loads the store and wires up the production transports and registry.
pub fn build_orchestrator(mut settings: Settings, store_path: Option<String>) -> CliResult<Orchestrator> {
    ceph_matrix::merge_into(&mut settings);
    let path = store_path.unwrap_or_else(|| settings.store.path.clone());
    let store = TableStore::load(&path).map_err(|e| {
        error!("Failed to load record store: {}", e);
        e
    })?;
    let transports = Transports::from_settings(&settings)?;

    Ok(Orchestrator::new(
        settings,
        transports,
        Registry::standard(),
        Box::new(store),
        Arc::new(Console::stdout()),
    ))
}

/// Checks every enabled application, then prints the summary.
pub async fn check_all(orchestrator: &Orchestrator, workers: Option<usize>) -> CliResult<BatchReport> {
    let workers = workers.unwrap_or(orchestrator.settings().checker.workers);
    let report = orchestrator.check_all(workers).await?;
    show_summary(orchestrator).await;
    Ok(report)
}

/// Checks every instance of `app`. An unknown name lists what the store
/// holds and fails.
pub async fn check_app(orchestrator: &Orchestrator, app: &str) -> CliResult<BatchReport> {
    if let Some(report) = orchestrator.check_one(app).await? {
        return Ok(report);
    }

    let names = orchestrator
        .with_store(|store| store.application_names())
        .await;
    let console = orchestrator.console();
    console.print(format!("Application '{}' not found", app));
    console.print("Available applications:");
    for name in names {
        console.print(format!("  {}", name));
    }
    Err(format!("Application '{}' not found", app).into())
}

pub async fn show_summary(orchestrator: &Orchestrator) {
    let text = orchestrator.with_store(reporting::summary).await;
    orchestrator.console().print(text);
}

pub async fn show_list(orchestrator: &Orchestrator) {
    let text = orchestrator.with_store(reporting::listing).await;
    orchestrator.console().print(text);
}

pub async fn show_updates(orchestrator: &Orchestrator) {
    let text = orchestrator.with_store(reporting::updates).await;
    orchestrator.console().print(text);
}

/// Rebuilds the compatibility file at `proxmox.matrix_path`. A roadmap that
/// yields no versions fails and leaves the existing file in place.
pub async fn refresh_ceph_matrix(
    settings: &Settings,
    http: &dyn HttpClient,
    console: &Console,
) -> CliResult<CephMatrix> {
    console.print("=== Proxmox-Ceph Compatibility Matrix Refresh ===");
    let matrix = ceph_matrix::fetch(http).await.map_err(|e| {
        error!("Failed to fetch the Proxmox roadmap: {}", e);
        e
    })?;
    if matrix.is_empty() {
        console.print("No versions found in the Proxmox roadmap");
        return Err("no Ceph versions found in the Proxmox roadmap".into());
    }

    for (series, ceph) in matrix.iter().rev() {
        console.print(format!("  Found: Proxmox {} -> Ceph {}", series, ceph));
    }
    let path = &settings.proxmox.matrix_path;
    ceph_matrix::save(path, &matrix)?;
    console.print(format!("Compatibility matrix saved to {}", path));
    Ok(matrix)
}

async fn prompt<R>(console: &Console, input: &mut R, text: &str) -> CliResult<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    console.print(text);
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn menu_banner(console: &Console) {
    let rule = "=".repeat(50);
    console.print(format!("\n{}", rule));
    console.print("Version Checker Management System");
    console.print(rule);
    console.print("1. Check all applications");
    console.print("2. Check single application");
    console.print("3. Show summary");
    console.print("4. Show all applications");
    console.print("5. Exit");
}

/// Interactive loop reading choices from `input` until exit or end of input.
pub async fn menu<R>(orchestrator: &Orchestrator, mut input: R) -> CliResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let console = orchestrator.console();
    loop {
        menu_banner(console);
        let Some(choice) = prompt(console, &mut input, "Enter choice (1-5): ").await? else {
            break;
        };

        match choice.as_str() {
            "1" => {
                check_all(orchestrator, None).await?;
            }
            "2" => {
                show_list(orchestrator).await;
                let Some(answer) =
                    prompt(console, &mut input, "Enter application number (0-based): ").await?
                else {
                    break;
                };
                match answer.parse::<usize>() {
                    Ok(row) => {
                        if let Err(e) = orchestrator.check_row(row).await {
                            warn!("Menu check of row {} failed: {}", row, e);
                            console.print("Invalid application number");
                        }
                    }
                    Err(_) => console.print("Please enter a valid number"),
                }
            }
            "3" => show_summary(orchestrator).await,
            "4" => show_list(orchestrator).await,
            "5" => {
                console.print("Goodbye!");
                break;
            }
            _ => console.print("Invalid choice. Please try again."),
        }
    }
    Ok(())
}

fn init_logging(settings: &Settings) -> CliResult<()> {
    verwatch_utils::logging::init_with_format(&settings.log.level, &settings.log.format)
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Runs the parsed command line. Any error ends the process with a non-zero
/// exit code.
pub async fn run(cli: Cli) -> CliResult<()> {
    let settings = Settings::new(cli.config.clone())?;
    init_logging(&settings)?;
    info!("Starting verwatch");

    let command = cli.command.unwrap_or(Commands::Menu);
    if command == Commands::RefreshCephMatrix {
        let http = ReqwestHttp::new(&settings.checker)?;
        refresh_ceph_matrix(&settings, &http, &Console::stdout()).await?;
        return Ok(());
    }

    let orchestrator = build_orchestrator(settings, cli.store.clone())?;

    match command {
        Commands::CheckAll { workers } => {
            check_all(&orchestrator, workers).await?;
        }
        Commands::Check { app } => {
            check_app(&orchestrator, &app).await?;
        }
        Commands::Summary => show_summary(&orchestrator).await,
        Commands::List => show_list(&orchestrator).await,
        Commands::Updates => show_updates(&orchestrator).await,
        Commands::Menu => menu(&orchestrator, BufReader::new(tokio::io::stdin())).await?,
        // runs without a store, above
        Commands::RefreshCephMatrix => {}
    }
    Ok(())
}
