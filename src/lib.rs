// src/lib.rs

pub mod cli;
pub mod config;
pub mod constraint;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod gate;
pub mod logging;
pub mod model;
pub mod permission;
pub mod readiness;
pub mod schedule;
pub mod store;
pub mod types;

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::load_or_default;
use crate::engine::{
    CascadeReport, CascadeSink, Engine, MutationNotification, NotificationRuntime, RuntimeEvent,
};
use crate::model::Task;
use crate::store::{MemoryStore, StoreExt};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the snapshot-backed store and the engine
/// - the command itself, printing its result as JSON
/// - a project recompute after commands that change tasks
/// - saving the snapshot back with `--write`
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;
    let snapshot_path = PathBuf::from(&args.snapshot);
    let store = Arc::new(
        MemoryStore::load_snapshot(&snapshot_path)
            .with_context(|| format!("loading snapshot {}", snapshot_path.display()))?,
    );
    let engine = Engine::new(Arc::clone(&store), cfg);

    let output = match args.command {
        Command::Recompute { project } => {
            let projects = match project {
                Some(p) => vec![p],
                None => store.project_ids()?,
            };
            let mut reports = Vec::with_capacity(projects.len());
            for project_id in projects.iter() {
                reports.push(engine.recompute_project(project_id)?);
            }
            to_json(&reports)?
        }
        Command::ValidateEdge { task, predecessor } => {
            match engine.validate_edge(&task, &predecessor) {
                Ok(()) => json!({ "valid": true, "task": task, "predecessor": predecessor }),
                Err(err) if err.is_validation() => json!({
                    "valid": false,
                    "task": task,
                    "predecessor": predecessor,
                    "error": err.to_string(),
                }),
                Err(err) => return Err(err.into()),
            }
        }
        Command::AddEdge { task, predecessor } => {
            let updated = engine.add_predecessor(&task, &predecessor)?;
            with_cascade(&engine, &updated.project_id, to_json(&updated)?)?
        }
        Command::RemoveEdge { task, predecessor } => {
            let updated = engine.remove_predecessor(&task, &predecessor)?;
            with_cascade(&engine, &updated.project_id, to_json(&updated)?)?
        }
        Command::Start { task } => {
            let outcome = engine.request_start(&task)?;
            let project_id = store.require::<Task>(&task)?.project_id;
            with_cascade(&engine, &project_id, to_json(&outcome)?)?
        }
        Command::Complete { task } => {
            let updated = engine.complete_task(&task)?;
            with_cascade(&engine, &updated.project_id, to_json(&updated)?)?
        }
        Command::Hold {
            project,
            area,
            reason,
        } => {
            let report = engine.hold_area(&project, &area, reason.as_deref())?;
            with_cascade(&engine, &project, to_json(&report)?)?
        }
        Command::Release { project, area } => {
            let report = engine.release_area(&project, &area)?;
            with_cascade(&engine, &project, to_json(&report)?)?
        }
        Command::Shift { project, from, by } => {
            let report = engine.push_sequence(&project, from, by)?;
            to_json(&report)?
        }
        Command::Override {
            package,
            status,
            actor,
            reason,
            clear,
        } => {
            let permission = match (clear, status) {
                (true, _) => engine.clear_override(&package)?,
                (false, Some(status)) => engine.override_permission(
                    &package,
                    status,
                    actor.as_deref().unwrap_or_default(),
                    reason.as_deref(),
                )?,
                (false, None) => anyhow::bail!("override requires --status or --clear"),
            };
            to_json(&permission)?
        }
        Command::Replay { path } => replay(engine.clone(), Path::new(&path)).await?,
        Command::Check => {
            let mut projects = Vec::new();
            for project_id in store.project_ids()? {
                let result = engine.validate_project_graph(&project_id);
                projects.push(json!({
                    "project": project_id,
                    "valid": result.is_ok(),
                    "error": result.err().map(|e| e.to_string()),
                }));
            }
            json!({ "config": "ok", "projects": projects })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    if args.write {
        store.save_snapshot(&snapshot_path)?;
        info!(path = %snapshot_path.display(), "snapshot saved");
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Recompute the project so derived rows reflect the command's writes.
fn with_cascade(engine: &Engine<MemoryStore>, project_id: &str, result: Value) -> Result<Value> {
    let cascade = engine.recompute_project(project_id)?;
    Ok(json!({ "result": result, "cascade": cascade }))
}

/// Prints each cascade report as one JSON line.
struct StdoutSink;

impl CascadeSink for StdoutSink {
    fn deliver(
        &mut self,
        report: CascadeReport,
    ) -> Pin<Box<dyn Future<Output = crate::errors::Result<()>> + Send + '_>> {
        Box::pin(async move {
            println!("{}", serde_json::to_string(&report)?);
            Ok(())
        })
    }
}

/// Push every notification in a JSON-lines file through the async runtime.
async fn replay(engine: Engine<MemoryStore>, path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut notifications = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let notification: MutationNotification = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid notification", path.display(), idx + 1))?;
        notifications.push(notification);
    }
    debug!(count = notifications.len(), "replaying notifications");

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let runtime = NotificationRuntime::new(engine, rt_rx, StdoutSink);
    let handle = tokio::spawn(runtime.run());

    for notification in notifications {
        rt_tx.send(RuntimeEvent::Notification(notification)).await?;
    }
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    drop(rt_tx);

    let stats = handle.await??;
    to_json(&stats)
}
