//! Run progress stream.
//!
//! Every event is broadcast to live subscribers and appended to a bounded
//! history for its run so polling consumers can catch up.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use relift_core::status::Stage;
use relift_core::types::RunId;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Events retained per run.
pub const MAX_HISTORY_PER_RUN: usize = 256;

/// Runs whose history is retained; the oldest is evicted first.
pub const MAX_TRACKED_RUNS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Started,
    Running,
    Completed,
    Failed,
}

/// One progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub run_id: RunId,
    /// `None` for run-level events.
    pub stage: Option<Stage>,
    pub status: ProgressStatus,
    pub message: String,
    /// Overall run progress, 0-100.
    pub progress: u8,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        run_id: RunId,
        stage: Option<Stage>,
        status: ProgressStatus,
        message: impl Into<String>,
        progress: u8,
    ) -> Self {
        Self {
            run_id,
            stage,
            status,
            message: message.into(),
            progress: progress.min(100),
            timestamp: Utc::now(),
        }
    }

    /// Event for a stage at `stage_percent` of its own work.
    pub fn stage(
        run_id: RunId,
        stage: Stage,
        status: ProgressStatus,
        message: impl Into<String>,
        stage_percent: u8,
    ) -> Self {
        Self::new(
            run_id,
            Some(stage),
            status,
            message,
            stage.overall_progress(stage_percent),
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_none()
            && matches!(self.status, ProgressStatus::Completed | ProgressStatus::Failed)
    }
}

#[derive(Default)]
struct History {
    runs: HashMap<RunId, VecDeque<ProgressEvent>>,
    order: VecDeque<RunId>,
}

/// Fan-out progress stream shared by every run.
pub struct ProgressChannel {
    sender: broadcast::Sender<ProgressEvent>,
    history: Mutex<History>,
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            history: Mutex::new(History::default()),
        }
    }

    /// Record and broadcast an event. Never blocks on consumers.
    ///
    /// Progress within a run never decreases: an event reporting less than
    /// the run's last published value carries that value forward.
    pub fn publish(&self, mut event: ProgressEvent) {
        {
            let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            if !history.runs.contains_key(&event.run_id) {
                if history.order.len() >= MAX_TRACKED_RUNS {
                    if let Some(oldest) = history.order.pop_front() {
                        history.runs.remove(&oldest);
                    }
                }
                history.order.push_back(event.run_id);
            }
            let events = history.runs.entry(event.run_id).or_default();
            if let Some(last) = events.back() {
                event.progress = event.progress.max(last.progress);
            }
            if events.len() >= MAX_HISTORY_PER_RUN {
                events.pop_front();
            }
            events.push_back(event.clone());
        }
        tracing::debug!(
            run_id = %event.run_id,
            stage = ?event.stage,
            status = ?event.status,
            progress = event.progress,
            "{}",
            event.message,
        );
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Retained events for a run, oldest first.
    pub fn history(&self, run_id: RunId) -> Vec<ProgressEvent> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history
            .runs
            .get(&run_id)
            .map(|events| events.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, run_id: RunId) -> Option<ProgressEvent> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.runs.get(&run_id).and_then(|e| e.back().cloned())
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
