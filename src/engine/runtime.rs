// src/engine/runtime.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::store::EntityStore;

use super::cascade::CascadeReport;
use super::core::Engine;
use super::RuntimeEvent;

/// Where the runtime sends each finished cascade.
///
/// Production uses [`LoggingSink`]; tests can collect reports instead.
pub trait CascadeSink: Send {
    fn deliver(
        &mut self,
        report: CascadeReport,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Logs a one-line summary per cascade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl CascadeSink for LoggingSink {
    fn deliver(
        &mut self,
        report: CascadeReport,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if let Some(reason) = report.skipped.as_deref() {
                debug!(entity = ?report.entity, %reason, "notification skipped");
            } else if report.is_clean() {
                info!(
                    project = ?report.project_id,
                    entity = ?report.entity,
                    opened = report.constraints_opened,
                    cleared = report.constraints_cleared,
                    evaluated = report.tasks_evaluated,
                    packages = report.packages_rolled_up,
                    "cascade applied"
                );
            } else {
                warn!(
                    project = ?report.project_id,
                    entity = ?report.entity,
                    failures = report.failures.len(),
                    "cascade applied with failures"
                );
            }
            Ok(())
        })
    }
}

/// Totals for one runtime session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    pub notifications: usize,
    pub recomputes: usize,
    /// Notifications refused as invalid (e.g. no entity id).
    pub rejected: usize,
    /// Cascades that completed with at least one failed sub-operation.
    pub partial: usize,
}

/// Drives the [`Engine`] in response to `RuntimeEvent`s and hands each
/// cascade report to a [`CascadeSink`].
///
/// Evaluation itself is synchronous; this shell only owns the channel.
pub struct NotificationRuntime<S: EntityStore, K: CascadeSink> {
    engine: Engine<S>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    sink: K,
    stats: RuntimeStats,
}

impl<S: EntityStore, K: CascadeSink> fmt::Debug for NotificationRuntime<S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationRuntime")
            .field("engine", &self.engine)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<S: EntityStore, K: CascadeSink> NotificationRuntime<S, K> {
    pub fn new(engine: Engine<S>, event_rx: mpsc::Receiver<RuntimeEvent>, sink: K) -> Self {
        Self {
            engine,
            event_rx,
            sink,
            stats: RuntimeStats::default(),
        }
    }

    /// Main event loop. Returns when the channel closes or shutdown is
    /// requested.
    pub async fn run(mut self) -> Result<RuntimeStats> {
        info!("readygate runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let report = match event {
                RuntimeEvent::Notification(notification) => {
                    self.stats.notifications += 1;
                    match self.engine.handle_notification(&notification) {
                        Ok(report) => report,
                        Err(err) => {
                            self.stats.rejected += 1;
                            warn!(
                                entity = %notification.event.entity_name,
                                id = %notification.event.entity_id,
                                error = %err,
                                "notification rejected"
                            );
                            continue;
                        }
                    }
                }
                RuntimeEvent::RecomputeProject { project_id } => {
                    self.stats.recomputes += 1;
                    match self.engine.recompute_project(&project_id) {
                        Ok(report) => report,
                        Err(err) => {
                            self.stats.rejected += 1;
                            warn!(project = %project_id, error = %err, "recompute rejected");
                            continue;
                        }
                    }
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested; stopping runtime");
                    break;
                }
            };

            if !report.is_clean() {
                self.stats.partial += 1;
            }
            self.sink.deliver(report).await?;
        }

        info!(
            notifications = self.stats.notifications,
            recomputes = self.stats.recomputes,
            rejected = self.stats.rejected,
            "runtime exiting"
        );
        Ok(self.stats)
    }
}
