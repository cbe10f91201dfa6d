use anyhow::{anyhow, Result};
use clap::Parser;
use colored::*;
use fileseek::cli::{Cli, Commands, DupesArgs, SearchArgs};
use fileseek::task::messages::TaskMessage;
use fileseek::task::{TaskHandle, TaskState};
use fileseek::{app_config, logging, utils, DupeOptions, IndexStore, TaskCoordinator};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::mpsc::TryRecvError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    dotenv::dotenv().ok();

    let guard = logging::init_logger();

    utils::hide_cursor();
    let args = Cli::parse();
    let result = run(args);
    utils::show_cursor();

    if let Err(err) = result {
        error!("Error: {}", err);
        drop(guard);
        std::process::exit(1);
    }
}

fn run(args: Cli) -> Result<()> {
    let config = app_config::load_configuration()?;
    debug!("config: {:?}", config);

    let store = Arc::new(IndexStore::open(&config.index_file));
    let coordinator = TaskCoordinator::new(store, config.clone());

    match args.command {
        Commands::Index(index_args) => run_rebuild(&coordinator, &index_args.root),
        Commands::Search(search_args) => run_search(&coordinator, search_args),
        Commands::Dupes(dupes_args) => run_dupes(&coordinator, &config, dupes_args),
        Commands::PrintConfig => {
            println!("{:#?}", config);
            Ok(())
        }
    }
}

/// Poll the task channel at a fixed cadence, handing each message to the
/// renderer, until a terminal message arrives or the worker is gone and the
/// channel is drained. Cancelled and panicked workers emit no terminal
/// message; their exit is observed through the thread itself.
fn drain(handle: TaskHandle, mut on_message: impl FnMut(TaskMessage)) -> TaskState {
    loop {
        match handle.try_recv() {
            Ok(message) => {
                let terminal = message.is_terminal();
                on_message(message);
                if terminal {
                    break;
                }
            }
            Err(TryRecvError::Empty) => {
                if handle.is_finished() {
                    while let Ok(message) = handle.try_recv() {
                        on_message(message);
                    }
                    break;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(TryRecvError::Disconnected) => break,
        }
    }
    handle.join()
}

fn run_rebuild(coordinator: &TaskCoordinator, root: &std::path::Path) -> Result<()> {
    let start = Instant::now();
    let handle = coordinator.start_rebuild(root)?;

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Scanning directories...");
    let mut bar: Option<ProgressBar> = None;
    let mut failure: Option<String> = None;

    let state = drain(handle, |message| match message {
        TaskMessage::IndexProgress(p) => match p.percent {
            None => {
                spinner.set_message(format!("Scanning directories... {} files discovered", p.processed));
            }
            Some(percent) => {
                let bar = bar.get_or_insert_with(|| {
                    spinner.finish_and_clear();
                    let bar = ProgressBar::new(p.total as u64);
                    bar.set_style(
                        ProgressStyle::with_template(
                            "Indexing [{bar:30.cyan/dim}] {pos}/{len} files ({percent}%)",
                        )
                        .unwrap(),
                    );
                    bar
                });
                bar.set_position(p.processed as u64);
                debug!("Indexing progress: {:.1}% ({}/{})", percent, p.processed, p.total);
            }
        },
        TaskMessage::IndexComplete => {
            if let Some(bar) = bar.take() {
                bar.finish_and_clear();
            }
        }
        TaskMessage::Error(message) => failure = Some(message),
        _ => {}
    });
    spinner.finish_and_clear();

    if let Some(message) = failure {
        return Err(anyhow!(message));
    }
    let snapshot = coordinator.store().snapshot();
    info!(
        "Indexing {} in state {:?}: {} files in {}",
        root.display(),
        state,
        snapshot.len(),
        format!("{:.2}s", start.elapsed().as_secs_f64()).green()
    );
    Ok(())
}

fn run_search(coordinator: &TaskCoordinator, args: SearchArgs) -> Result<()> {
    // Index-first: a root with no entries under it has never been scanned.
    if let Some(root) = &args.root {
        let snapshot = coordinator.store().snapshot();
        let covered = snapshot.files.keys().any(|path| path.starts_with(root));
        if !covered {
            info!("No index entries under {}, rebuilding first", root.display());
            run_rebuild(coordinator, root)?;
        }
    }

    let start = Instant::now();
    let handle = coordinator.start_search(&args.keyword)?;
    let mut matches = 0usize;
    let mut failure: Option<String> = None;

    let state = drain(handle, |message| match message {
        TaskMessage::SearchResult(entry) => {
            matches += 1;
            println!(
                "{:>10}  {}  {}",
                utils::format_size(entry.size),
                utils::format_date(&entry.modified),
                entry.path.display()
            );
        }
        TaskMessage::SearchProgress(p) => {
            debug!("Search progress: {}/{}", p.current, p.total);
        }
        TaskMessage::Error(message) => failure = Some(message),
        _ => {}
    });

    if let Some(message) = failure {
        return Err(anyhow!(message));
    }
    if matches == 0 {
        println!("{}", "No matches found".yellow());
    }
    info!(
        "Search ended in state {:?} with {} matches in {}",
        state,
        matches,
        format!("{:.2}s", start.elapsed().as_secs_f64()).green()
    );
    Ok(())
}

fn run_dupes(
    coordinator: &TaskCoordinator,
    config: &app_config::AppConfig,
    args: DupesArgs,
) -> Result<()> {
    let options = DupeOptions {
        min_size: args.min_size.unwrap_or(config.min_dupe_size),
        prefix: args.prefix,
    };
    let start = Instant::now();
    let handle = coordinator.start_find_duplicates(options)?;

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(80));
    let mut groups = 0usize;
    let mut wasted: u64 = 0;
    let mut failure: Option<String> = None;

    let state = drain(handle, |message| match message {
        TaskMessage::DupProgress(p) => {
            spinner.set_message(format!("{}: {} of {}", p.stage, p.current, p.total));
        }
        TaskMessage::DupGroup(group) => {
            groups += 1;
            wasted += group.size * (group.count as u64 - 1);
            spinner.suspend(|| {
                println!(
                    "{}",
                    format!(
                        "{} duplicates - {} each  [{}]",
                        group.count,
                        utils::format_size(group.size),
                        &group.hash[..16.min(group.hash.len())]
                    )
                    .bold()
                );
                for file in &group.files {
                    println!("    {}", file.path.display());
                }
            });
        }
        TaskMessage::Error(message) => failure = Some(message),
        _ => {}
    });
    spinner.finish_and_clear();

    if let Some(message) = failure {
        return Err(anyhow!(message));
    }
    if groups == 0 {
        println!("{}", "No duplicate groups found".yellow());
    } else {
        println!(
            "{} groups, {} reclaimable",
            groups,
            utils::format_size(wasted).red()
        );
    }
    info!(
        "Duplicate scan ended in state {:?} with {} groups in {}",
        state,
        groups,
        format!("{:.2}s", start.elapsed().as_secs_f64()).green()
    );
    Ok(())
}
