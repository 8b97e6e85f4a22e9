//! Async driver for an [`ImportController`].
//!
//! The runtime owns a controller and a [`Fetcher`]. Each fetch the
//! controller asks for is spawned onto tokio wrapped in a timeout, and its
//! outcome is sent back over a channel tagged with the fetch ticket. A
//! periodic tick enforces the controller's own wall-clock budget and aborts
//! the task of a fetch that ran out of time.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::controller::{FetchRequest, FetchTicket, ImportController};
use super::fetch::{FetchError, Fetcher};
use super::{BoardEvent, Locator, Network, ParticipantId, ReplicatedState};
use crate::materialize::MaterializeReport;
use crate::render::StrokeRenderer;

struct Completion {
    ticket: FetchTicket,
    outcome: Result<String, FetchError>,
}

enum Wake {
    Completion(Completion),
    Tick,
    Closed,
}

/// Drives a controller's fetches on the tokio runtime.
pub struct BoardRuntime<N, R, F> {
    controller: ImportController<N, R>,
    fetcher: F,
    poll_interval: Duration,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    tasks: HashMap<FetchTicket, JoinHandle<()>>,
    last_report: Option<MaterializeReport>,
}

impl<N: Network, R: StrokeRenderer, F: Fetcher> BoardRuntime<N, R, F> {
    /// Create a runtime checking load timeouts every `poll_interval`.
    pub fn new(controller: ImportController<N, R>, fetcher: F, poll_interval: Duration) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            fetcher,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            completions_tx,
            completions_rx,
            tasks: HashMap::new(),
            last_report: None,
        }
    }

    /// The driven controller.
    pub fn controller(&self) -> &ImportController<N, R> {
        &self.controller
    }

    /// The driven controller, mutably.
    ///
    /// Fetch requests returned by calls made through this reference are
    /// not run; pass them to [`BoardRuntime::dispatch`].
    pub fn controller_mut(&mut self) -> &mut ImportController<N, R> {
        &mut self.controller
    }

    /// Number of fetch tasks still running.
    pub fn pending_fetches(&self) -> usize {
        self.tasks.len()
    }

    /// Request an import and start its fetch if accepted.
    pub fn request_import(&mut self, locator: Locator) -> Option<FetchTicket> {
        let request = self.controller.request_import(locator, Instant::now());
        self.dispatch(request)
    }

    /// Reload the last successful locator.
    pub fn reload(&mut self) -> Option<FetchTicket> {
        let request = self.controller.reload(Instant::now());
        self.dispatch(request)
    }

    /// Deliver a broadcast event.
    pub fn on_event(&mut self, event: BoardEvent) -> Option<FetchTicket> {
        if matches!(event, BoardEvent::Reset) {
            self.abort_all();
        }
        let request = self.controller.on_event(event, Instant::now());
        self.dispatch(request)
    }

    /// Deliver a replicated snapshot.
    pub fn on_snapshot(&mut self, state: ReplicatedState) -> Option<FetchTicket> {
        let request = self.controller.on_snapshot(state, Instant::now());
        self.dispatch(request)
    }

    /// Deliver a participant join.
    pub fn on_participant_joined(&mut self, participant: ParticipantId) -> Option<FetchTicket> {
        let request = self
            .controller
            .on_participant_joined(participant, Instant::now());
        self.dispatch(request)
    }

    /// Deliver a participant leaving.
    pub fn on_participant_left(&mut self, participant: ParticipantId) -> Option<FetchTicket> {
        let request = self
            .controller
            .on_participant_left(participant, Instant::now());
        self.dispatch(request)
    }

    /// Reset the board, cancelling every fetch.
    pub fn reset(&mut self) {
        self.abort_all();
        self.controller.reset();
    }

    /// Spawn the fetch for `request`, if any.
    pub fn dispatch(&mut self, request: Option<FetchRequest>) -> Option<FetchTicket> {
        let FetchRequest { ticket, locator } = request?;
        let limit = self.controller.settings().load_timeout;
        let fetch = self.fetcher.fetch(&locator);
        let tx = self.completions_tx.clone();

        tracing::debug!("Spawning fetch {} for {}", ticket, locator);
        let handle = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(limit, fetch).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout(limit)),
            };
            if tx.send(Completion { ticket, outcome }).is_err() {
                tracing::debug!("Runtime dropped before fetch {} completed", ticket);
            }
        });
        self.tasks.insert(ticket, handle);
        Some(ticket)
    }

    /// Process outcomes until the controller stops loading.
    ///
    /// Returns the report of the import that completed, if any.
    pub async fn settle(&mut self) -> Option<MaterializeReport> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.controller.is_loading() {
            let wake = tokio::select! {
                completion = self.completions_rx.recv() => {
                    completion.map_or(Wake::Closed, Wake::Completion)
                }
                _ = ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Completion(completion) => self.complete(completion),
                Wake::Tick => self.tick(),
                Wake::Closed => break,
            }
        }

        self.last_report.take()
    }

    /// Run one timeout check.
    pub fn tick(&mut self) {
        if let Some(ticket) = self.controller.tick(Instant::now()) {
            if let Some(handle) = self.tasks.remove(&ticket) {
                tracing::debug!("Cancelling timed-out fetch {}", ticket);
                handle.abort();
            }
        }
    }

    fn complete(&mut self, completion: Completion) {
        let Completion { ticket, outcome } = completion;
        self.tasks.remove(&ticket);

        match outcome {
            Ok(text) => {
                if let Some(report) = self.controller.on_fetch_success(ticket, &text) {
                    self.last_report = Some(report);
                }
            }
            Err(FetchError::Timeout(_)) => self.controller.on_fetch_timeout(ticket),
            Err(e) => self.controller.on_fetch_error(ticket, &e),
        }
    }

    fn abort_all(&mut self) {
        for (ticket, handle) in self.tasks.drain() {
            tracing::debug!("Cancelling fetch {}", ticket);
            handle.abort();
        }
    }
}

impl<N, R, F> Drop for BoardRuntime<N, R, F> {
    fn drop(&mut self) {
        for handle in self.tasks.values() {
            handle.abort();
        }
    }
}
