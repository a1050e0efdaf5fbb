//! The capture-to-verdict pipeline.
//!
//! One [`Workflow::trigger`] call runs one linear cycle:
//!
//! ```text
//! Idle → Capturing → Reducing → AwaitingLocation → Uploading → Succeeded | Failed
//!  ↑                                                                     │
//!  └──────────────────────────── next trigger ───────────────────────────┘
//! ```
//!
//! Each stage hands its output to the next directly; there is no callback
//! nesting and no cancellation. Progress is published as [`WorkflowEvent`]s on
//! a channel whose single consumer renders them (see
//! [`output::format_workflow_event`](crate::output::format_workflow_event)).
//!
//! A trigger that arrives while a cycle is in flight is refused with
//! [`Cycle::Busy`]; the running cycle is unaffected.

use crate::capture::{CaptureError, CaptureTrigger};
use crate::imaging::{
    FallbackReason, ImageBackend, ReduceConfig, Reduction, RustBackend, reduce_image,
};
use crate::location::{LocationFix, LocationSupplier, PositionCell};
use crate::types::CapturedImage;
use crate::upload::{UploadClient, UploadOutcome};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Capturing,
    Reducing,
    AwaitingLocation,
    Uploading,
    Succeeded,
    Failed,
}

impl WorkflowState {
    /// States from which a new trigger starts a cycle.
    pub fn accepts_trigger(self) -> bool {
        matches!(
            self,
            WorkflowState::Idle | WorkflowState::Succeeded | WorkflowState::Failed
        )
    }
}

/// Progress notifications for the display.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    StateChanged(WorkflowState),
    Location(LocationFix),
    Captured(CapturedImage),
    CaptureFailed(String),
    Reduced(Reduction),
    Analyzing,
    Finished(UploadOutcome),
    Busy,
}

/// Result of one trigger.
#[derive(Debug)]
pub enum Cycle {
    /// Another cycle was in flight; nothing happened.
    Busy,
    /// The camera failed or was not ready; the cycle stopped there.
    CaptureFailed(CaptureError),
    /// The upload stage ran (or refused for lack of position).
    Completed(UploadOutcome),
}

impl Cycle {
    pub fn is_success(&self) -> bool {
        matches!(self, Cycle::Completed(o) if o.is_success())
    }
}

pub struct Workflow<B: ImageBackend + 'static = RustBackend> {
    trigger: CaptureTrigger,
    location: LocationSupplier,
    uploader: UploadClient,
    backend: Arc<B>,
    reduce_config: ReduceConfig,
    output_dir: PathBuf,
    state: Mutex<WorkflowState>,
    events: Sender<WorkflowEvent>,
}

impl Workflow<RustBackend> {
    pub fn new(
        trigger: CaptureTrigger,
        location: LocationSupplier,
        uploader: UploadClient,
        output_dir: PathBuf,
        events: Sender<WorkflowEvent>,
    ) -> Self {
        Self {
            trigger,
            location,
            uploader,
            backend: Arc::new(RustBackend::new()),
            reduce_config: ReduceConfig::default(),
            output_dir,
            state: Mutex::new(WorkflowState::Idle),
            events,
        }
    }
}

impl<B: ImageBackend + 'static> Workflow<B> {
    /// Swap the imaging backend (tests use a recording mock).
    pub fn with_backend<B2: ImageBackend + 'static>(self, backend: B2) -> Workflow<B2> {
        Workflow {
            trigger: self.trigger,
            location: self.location,
            uploader: self.uploader,
            backend: Arc::new(backend),
            reduce_config: self.reduce_config,
            output_dir: self.output_dir,
            state: self.state,
            events: self.events,
        }
    }

    pub fn with_reduce_config(mut self, config: ReduceConfig) -> Self {
        self.reduce_config = config;
        self
    }

    pub fn state(&self) -> WorkflowState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn position_cell(&self) -> &PositionCell {
        self.location.cell()
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    fn emit(&self, event: WorkflowEvent) {
        // A closed display just means nobody is watching
        let _ = self.events.send(event);
    }

    fn set_state(&self, next: WorkflowState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
        tracing::debug!(state = ?next, "workflow");
        self.emit(WorkflowEvent::StateChanged(next));
    }

    /// Claim the pipeline for a new cycle. False if one is already running.
    ///
    /// A settled cycle (`Succeeded`/`Failed`) hands back to `Idle` first, so
    /// every cycle starts from `Idle`.
    fn begin(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.accepts_trigger() {
            return false;
        }
        let settled = *state != WorkflowState::Idle;
        *state = WorkflowState::Capturing;
        drop(state);
        if settled {
            self.emit(WorkflowEvent::StateChanged(WorkflowState::Idle));
        }
        self.emit(WorkflowEvent::StateChanged(WorkflowState::Capturing));
        true
    }

    /// Ask for a fresh last-known position in the background.
    ///
    /// The returned handle resolves after the answer has been stored and
    /// announced; callers are free to drop it.
    pub fn refresh_location(&self) -> JoinHandle<LocationFix> {
        let lookup = self.location.request();
        let events = self.events.clone();
        tokio::spawn(async move {
            let fix = lookup.await.unwrap_or(LocationFix::Unavailable);
            let _ = events.send(WorkflowEvent::Location(fix));
            fix
        })
    }

    /// Run one capture cycle to completion.
    pub async fn trigger(&self) -> Cycle {
        if !self.begin() {
            tracing::debug!("trigger ignored, cycle in flight");
            self.emit(WorkflowEvent::Busy);
            return Cycle::Busy;
        }

        let cycle = self.run_cycle().await;
        self.set_state(if cycle.is_success() {
            WorkflowState::Succeeded
        } else {
            WorkflowState::Failed
        });
        cycle
    }

    async fn run_cycle(&self) -> Cycle {
        let captured = match self
            .trigger
            .capture(&self.output_dir, chrono::Local::now())
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("{e}");
                self.emit(WorkflowEvent::CaptureFailed(e.to_string()));
                return Cycle::CaptureFailed(e);
            }
        };
        self.emit(WorkflowEvent::Captured(captured.clone()));

        self.set_state(WorkflowState::Reducing);
        let reduction = self.reduce(&captured).await;
        self.emit(WorkflowEvent::Reduced(reduction.clone()));

        self.set_state(WorkflowState::AwaitingLocation);
        let position = self.location.cell().load();
        if position.is_some() {
            self.set_state(WorkflowState::Uploading);
            self.emit(WorkflowEvent::Analyzing);
        }

        let outcome = self.uploader.upload(reduction.path(), position).await;
        self.emit(WorkflowEvent::Finished(outcome.clone()));
        Cycle::Completed(outcome)
    }

    async fn reduce(&self, captured: &CapturedImage) -> Reduction {
        let backend = Arc::clone(&self.backend);
        let source = captured.path.clone();
        let output_dir = self.output_dir.clone();
        let config = self.reduce_config;
        tokio::task::spawn_blocking(move || {
            reduce_image(&*backend, &source, &output_dir, &config)
        })
        .await
        .unwrap_or_else(|e| Reduction::Unreduced {
            path: captured.path.clone(),
            reason: FallbackReason::Encode(e.to_string()),
        })
    }
}
