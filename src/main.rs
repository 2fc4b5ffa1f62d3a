/*
 * This file is part of Buttonparts.
 *
 * Copyright (C) 2025 Buttonparts contributors
 *
 * Buttonparts is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Buttonparts is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Buttonparts. If not, see <https://www.gnu.org/licenses/>.
 */

use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use buttonparts::config::{config_path, DaemonConfig};
use buttonparts::logger;
use buttonparts::{
    device_registry, JsonPreferenceStore, MemoryPreferenceStore, NodeReader, PollingSensorManager,
    PreferenceRegistry, PreferenceStore, ProximityController, SyncEngine, SysfsNode,
};

const USAGE: &str = "\
usage: buttonpartsd [--config <path>] [--verbose] <command>

commands:
  sync               apply stored preferences to their control nodes
  set <key> <value>  store a preference and apply it
  status             show every preference and its node
  --service          sync, then run pocket mode until interrupted";

enum Command {
    Sync,
    Set { key: String, value: String },
    Status,
    Service,
}

struct Args {
    config: PathBuf,
    verbose: bool,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut config = config_path();
    let mut verbose = false;
    let mut rest: Vec<&str> = Vec::new();

    let mut it = args.iter().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let path = it.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                config = PathBuf::from(path);
            }
            "--verbose" | "-v" => verbose = true,
            other => rest.push(other),
        }
    }

    let command = match rest.as_slice() {
        ["sync"] => Command::Sync,
        ["set", key, value] => Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        },
        ["status"] => Command::Status,
        ["--service"] => Command::Service,
        _ => bail!("{}", USAGE),
    };

    Ok(Args {
        config,
        verbose,
        command,
    })
}

fn main() -> Result<()> {
    let argv: Vec<String> = std::env::args().collect();
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let cfg = DaemonConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let sink = logger::init_logging(&logger::filter_directive(args.verbose, &cfg.log_level));
    tracing::debug!(?sink, "logging initialized");

    // Control nodes are root-owned; status only reads
    if !matches!(args.command, Command::Status) && unsafe { libc::geteuid() } != 0 {
        eprintln!("Error: buttonpartsd requires root privileges to write control nodes.");
        std::process::exit(1);
    }

    let registry = device_registry()?;
    let store = open_store(&cfg);
    let node = Arc::new(SysfsNode::new());
    let engine = SyncEngine::new(Arc::clone(&registry), Arc::clone(&store), node.clone(), node.clone());

    match args.command {
        Command::Sync => {
            let report = engine.sync();
            for (key, outcome) in &report.outcomes {
                println!("{}: {}", key, outcome);
            }
            Ok(())
        }
        Command::Set { key, value } => {
            let outcome = engine.set(&key, &value)?;
            println!("{}: {}", key, outcome);
            Ok(())
        }
        Command::Status => {
            print_status(&registry, store.as_ref(), node.as_ref(), &engine);
            Ok(())
        }
        Command::Service => run_service(&cfg, &registry, node, &engine),
    }
}

/// Fires once per SIGINT or SIGTERM
fn shutdown_signal() -> Result<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("installing signal handler")?;
    Ok(rx)
}

fn open_store(cfg: &DaemonConfig) -> Arc<dyn PreferenceStore> {
    match JsonPreferenceStore::open(&cfg.store_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Preferences unavailable ({}), using defaults for this run", e);
            Arc::new(MemoryPreferenceStore::new())
        }
    }
}

fn print_status(
    registry: &PreferenceRegistry,
    store: &dyn PreferenceStore,
    reader: &dyn NodeReader,
    engine: &SyncEngine,
) {
    for entry in registry.entries() {
        let current = reader
            .read(&entry.node)
            .unwrap_or_else(|e| format!("<{}>", e));
        let stored = store
            .user_value(&entry.key)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{}", entry.key);
        println!("  node:       {}", entry.node.display());
        println!("  current:    {}", current);
        println!("  stored:     {}", stored);
        println!("  default:    {}", entry.default);
        if let Some(rule) = &entry.dependency {
            println!(
                "  dependency: {} == '{}' ({})",
                rule.node.display(),
                rule.expected,
                if engine.dependencies().is_satisfied(&entry.key) { "met" } else { "not met" }
            );
        }
    }
    if let Some(pocket) = registry.pocket_mode() {
        println!("{}", pocket.key);
        println!("  node:       {}", pocket.node.display());
        println!("  enabled:    {}", engine.pocket_mode_enabled());
    }
}

fn run_service(
    cfg: &DaemonConfig,
    registry: &PreferenceRegistry,
    node: Arc<SysfsNode>,
    engine: &SyncEngine,
) -> Result<()> {
    info!("buttonpartsd {} starting", env!("CARGO_PKG_VERSION"));
    engine.sync();

    let controller = match registry.pocket_mode() {
        Some(pocket) => {
            if engine.pocket_mode_enabled() {
                let sensors = Arc::new(PollingSensorManager::new(
                    &cfg.proximity_input,
                    cfg.proximity_max_range,
                ));
                match ProximityController::new(sensors, node, &pocket.node) {
                    Ok(controller) => {
                        controller.enable()?;
                        Some(controller)
                    }
                    Err(e) => {
                        warn!("Pocket mode unavailable: {}", e);
                        None
                    }
                }
            } else {
                info!("Pocket mode is switched off");
                None
            }
        }
        None => None,
    };

    let _ = shutdown_signal()?.recv();
    info!("Received shutdown signal");

    if let Some(controller) = controller {
        controller.disable()?;
        controller.wait_idle()?;
        controller.shutdown();
    }
    info!("buttonpartsd stopped");
    Ok(())
}
