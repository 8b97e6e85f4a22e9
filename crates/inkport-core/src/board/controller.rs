//! Per-participant import state machine.
//!
//! ```text
//! Idle -> Loading -> Importing -> Idle
//!                 -> SizeChecking -> Idle (awaiting confirmation)
//!                                 -> Importing -> Idle
//!                 -> TimedOut -> Idle
//! ```
//!
//! The controller never performs I/O. Operations that start a load return
//! a [`FetchRequest`]; the host runs the fetch and reports the outcome back
//! with the request's [`FetchTicket`]. Outcomes carrying a stale ticket are
//! ignored, so a fetch that completes after its load timed out or was reset
//! has no effect.
//!
//! Nothing here returns an error to the host. Failures become a [`Status`].

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use super::gate::{self, GateDecision};
use super::{BoardEvent, Locator, Network, ParticipantId, ReplicatedState, Status};
use crate::codec;
use crate::config::Config;
use crate::materialize::{self, Grouping, MaterializeOptions, MaterializeReport, Placement};
use crate::render::{Container, StrokeRenderer};

/// Scale changes smaller than this keep a pending size approval.
const SCALE_EPSILON: f32 = 0.001;

/// Identifies one started load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket(pub u64);

impl fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fetch the host should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Ticket to report the outcome with
    pub ticket: FetchTicket,
    /// What to fetch
    pub locator: Locator,
}

/// Why a load was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Local request or reload
    Requested,
    /// Another participant's broadcast
    Broadcast,
    /// Automatic catch-up after joining or resynchronizing
    CatchUp,
}

/// Where the controller is in the import cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Nothing in progress
    Idle,
    /// Waiting for a fetch outcome
    Loading {
        /// Ticket of the pending fetch
        ticket: FetchTicket,
        /// Locator being fetched
        locator: Locator,
        /// When the fetch started
        started: Instant,
        /// Why it started
        origin: LoadOrigin,
    },
    /// Checking a fetched payload's size
    SizeChecking {
        /// Locator being checked
        locator: Locator,
    },
    /// Materializing a fetched payload
    Importing {
        /// Locator being imported
        locator: Locator,
    },
    /// The last fetch ran out of time
    TimedOut,
}

impl Phase {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::SizeChecking { .. } => "size-checking",
            Self::Importing { .. } => "importing",
            Self::TimedOut => "timed-out",
        }
    }
}

/// Tunables for one controller.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Width for strokes without one
    pub default_width: f32,
    /// Size gate limit
    pub max_bounding_size: f32,
    /// Fetch budget
    pub load_timeout: Duration,
    /// Initial scale
    pub scale: f32,
    /// Initial pickup mode
    pub pickup_mode: bool,
    /// Group world-fixed strokes by color
    pub group_by_color: bool,
    /// Render layer for strokes
    pub line_layer: u32,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ImportSettings {
    /// Settings from the `[import]` and `[render]` sections.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_width: config.import.default_width,
            max_bounding_size: config.import.max_bounding_size,
            load_timeout: config.import.load_timeout,
            scale: config.import.scale,
            pickup_mode: config.render.pickup_mode && config.render.pickup_enabled,
            group_by_color: config.render.group_by_color,
            line_layer: config.render.line_layer,
        }
    }
}

/// Import state machine for one board on one participant.
pub struct ImportController<N, R> {
    network: N,
    renderer: R,
    settings: ImportSettings,
    state: ReplicatedState,
    phase: Phase,
    next_ticket: u64,
    scale: f32,
    pickup_mode: bool,
    approved_url: Option<Locator>,
    last_loaded_url: Option<Locator>,
    caught_up: Option<Locator>,
    statuses: Vec<Status>,
}

impl<N: Network, R: StrokeRenderer> ImportController<N, R> {
    /// Create a controller in the idle state.
    pub fn new(network: N, renderer: R, settings: ImportSettings) -> Self {
        let scale = if valid_scale(settings.scale) {
            settings.scale
        } else {
            1.0
        };
        let pickup_mode = settings.pickup_mode && renderer.has_pickup();
        Self {
            network,
            renderer,
            settings,
            state: ReplicatedState::default(),
            phase: Phase::Idle,
            next_ticket: 1,
            scale,
            pickup_mode,
            approved_url: None,
            last_loaded_url: None,
            caught_up: None,
            statuses: Vec::new(),
        }
    }

    /// Settings the controller was created with.
    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Current phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    /// Ticket of the outstanding fetch.
    pub fn pending_ticket(&self) -> Option<FetchTicket> {
        match &self.phase {
            Phase::Loading { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    /// Local view of the replicated state.
    pub fn state(&self) -> &ReplicatedState {
        &self.state
    }

    /// Current scale factor.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Whether imports go into the pickup container.
    pub fn pickup_mode(&self) -> bool {
        self.pickup_mode
    }

    /// Locator approved to bypass the size gate.
    pub fn approved_url(&self) -> Option<&Locator> {
        self.approved_url.as_ref()
    }

    /// Last locator imported successfully on this participant.
    pub fn last_loaded_url(&self) -> Option<&Locator> {
        self.last_loaded_url.as_ref()
    }

    /// Most recent status.
    pub fn status(&self) -> Option<&Status> {
        self.statuses.last()
    }

    /// Take every status reported since the last call.
    pub fn take_statuses(&mut self) -> Vec<Status> {
        std::mem::take(&mut self.statuses)
    }

    /// The host network handle.
    pub fn network(&self) -> &N {
        &self.network
    }

    /// The host network handle, mutably.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// The renderer strokes are materialized into.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Consume the controller, returning the renderer.
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Accept a new import for the whole session.
    ///
    /// Refused while this participant is loading, or while another
    /// participant's import is in flight and this one is not the owner.
    pub fn request_import(&mut self, locator: Locator, now: Instant) -> Option<FetchRequest> {
        if self.is_loading() {
            tracing::warn!("Already loading another payload, ignoring {}", locator);
            self.report(Status::warning("Another payload is loading"));
            return None;
        }
        if self.state.import_in_flight && !self.network.is_owner() {
            tracing::warn!("Another participant is importing, refusing {}", locator);
            self.report(Status::warning("Another participant is importing"));
            return None;
        }

        if !self.network.is_owner() {
            self.network.request_ownership();
        }
        if !self.network.is_owner() {
            tracing::warn!("Ownership was not granted, refusing {}", locator);
            self.report(Status::warning("Could not take control of the board"));
            return None;
        }

        tracing::info!(
            "{} accepted import of {}",
            self.network.local_participant(),
            locator
        );
        self.clear_local();
        self.state.current_url = Some(locator.clone());
        self.state.has_ever_imported = true;
        self.state.import_in_flight = true;
        self.caught_up = Some(locator.clone());
        self.network.replicate(&self.state);
        self.network.broadcast(BoardEvent::BeginImport(locator.clone()));

        Some(self.start_load(locator, LoadOrigin::Requested, now))
    }

    /// Re-import the last locator that loaded successfully here.
    pub fn reload(&mut self, now: Instant) -> Option<FetchRequest> {
        match self.last_loaded_url.clone() {
            Some(locator) => self.request_import(locator, now),
            None => {
                self.report(Status::warning("Nothing to reload"));
                None
            }
        }
    }

    /// Handle an event broadcast by another participant.
    pub fn on_event(&mut self, event: BoardEvent, now: Instant) -> Option<FetchRequest> {
        match event {
            BoardEvent::BeginImport(locator) => {
                if self.is_loading() {
                    tracing::warn!("Begin-import for {} received while loading", locator);
                    self.report(Status::warning("Another payload is loading"));
                    return None;
                }
                self.caught_up = Some(locator.clone());
                self.clear_local();
                Some(self.start_load(locator, LoadOrigin::Broadcast, now))
            }
            BoardEvent::Reset => {
                tracing::info!("Board reset by another participant");
                self.phase = Phase::Idle;
                self.clear_local();
                self.caught_up = None;
                self.last_loaded_url = None;
                self.approved_url = None;
                self.report(Status::info("Board was reset"));
                None
            }
        }
    }

    /// Apply a replicated snapshot from the owner.
    pub fn on_snapshot(&mut self, snapshot: ReplicatedState, now: Instant) -> Option<FetchRequest> {
        if self.network.is_owner() {
            tracing::debug!("Ignoring snapshot as owner");
            return None;
        }

        let previous = std::mem::replace(&mut self.state, snapshot);
        if previous.pickup_active != self.state.pickup_active {
            self.renderer.set_pickup_active(self.state.pickup_active);
        }
        if previous.current_url.is_some() && self.state.current_url.is_none() {
            tracing::info!("Board cleared by its owner");
            self.clear_local();
            self.caught_up = None;
            self.report(Status::info("Board was cleared"));
            return None;
        }

        self.catch_up(now)
    }

    /// Handle a participant joining the session.
    pub fn on_participant_joined(
        &mut self,
        participant: ParticipantId,
        now: Instant,
    ) -> Option<FetchRequest> {
        if participant == self.network.local_participant() {
            return self.catch_up(now);
        }
        if self.network.is_owner() {
            tracing::debug!("{} joined, replicating board state", participant);
            self.network.replicate(&self.state);
        }
        None
    }

    /// Handle a participant leaving the session.
    ///
    /// An import still marked in flight when the board passes to a
    /// participant that is not loading it can never finish. The new owner
    /// releases it and catches up.
    pub fn on_participant_left(
        &mut self,
        participant: ParticipantId,
        now: Instant,
    ) -> Option<FetchRequest> {
        if !self.network.is_owner() || !self.state.import_in_flight || self.is_loading() {
            return None;
        }
        tracing::warn!("{} left during an import, releasing it", participant);
        self.release_in_flight();
        self.catch_up(now)
    }

    /// Report a fetched payload.
    pub fn on_fetch_success(
        &mut self,
        ticket: FetchTicket,
        text: &str,
    ) -> Option<MaterializeReport> {
        let (locator, origin) = self.accept_outcome(ticket)?;

        let decoded = match codec::decode(text, self.settings.default_width) {
            Ok(decoded) => decoded,
            Err(codec::DecodeError::Empty) => {
                tracing::warn!("{} has no strokes", locator);
                self.report(Status::warning("Nothing to import"));
                self.finish_load();
                return None;
            }
            Err(e) => {
                tracing::error!("Failed to decode {}: {}", locator, e);
                self.report(Status::error(format!("Invalid payload: {e}")));
                self.finish_load();
                return None;
            }
        };

        if self.needs_size_check(&locator, origin) {
            self.transition(Phase::SizeChecking {
                locator: locator.clone(),
            });
            let decision = gate::check(
                &decoded.payload,
                self.scale,
                self.settings.max_bounding_size,
            );
            if let GateDecision::Exceeded { longest_side } = decision {
                tracing::warn!(
                    "{} is {:.2} units across, over the {:.2} limit; awaiting confirmation",
                    locator,
                    longest_side,
                    self.settings.max_bounding_size
                );
                self.approved_url = Some(locator);
                self.report(Status::warning(format!(
                    "Large model ({longest_side:.1} units). Reload to confirm"
                )));
                self.finish_load();
                return None;
            }
        }

        self.transition(Phase::Importing {
            locator: locator.clone(),
        });
        self.clear_local();
        let options = self.materialize_options();
        if options.placement == Placement::Pickup && !self.state.pickup_active {
            self.activate_pickup();
        }
        let report = materialize::materialize(&mut self.renderer, &decoded.payload, options);

        self.last_loaded_url = Some(locator);
        let skipped = decoded.skipped.len() + report.failed;
        if skipped > 0 {
            self.report(Status::warning(format!(
                "Imported {} strokes ({} skipped)",
                report.created, skipped
            )));
        } else {
            self.report(Status::success(format!("Imported {} strokes", report.created)));
        }
        self.finish_load();
        Some(report)
    }

    /// Report a failed fetch.
    pub fn on_fetch_error(&mut self, ticket: FetchTicket, error: &super::FetchError) {
        let Some((locator, _)) = self.accept_outcome(ticket) else {
            return;
        };
        tracing::error!("Failed to load {}: {}", locator, error);
        self.report(Status::error(format!("Load failed: {error}")));
        self.finish_load();
    }

    /// Report that the fetch for `ticket` ran out of time.
    pub fn on_fetch_timeout(&mut self, ticket: FetchTicket) {
        if self.pending_ticket() == Some(ticket) {
            self.time_out();
        } else {
            tracing::debug!("Ignoring timeout for stale fetch {}", ticket);
        }
    }

    /// Periodic check of the load budget.
    ///
    /// Returns the ticket of a fetch that just timed out so the host can
    /// cancel it.
    pub fn tick(&mut self, now: Instant) -> Option<FetchTicket> {
        match &self.phase {
            Phase::Loading {
                ticket, started, ..
            } if now.saturating_duration_since(*started) >= self.settings.load_timeout => {
                let ticket = *ticket;
                self.time_out();
                Some(ticket)
            }
            Phase::TimedOut => {
                self.transition(Phase::Idle);
                None
            }
            _ => None,
        }
    }

    /// Destroy every imported stroke and forget the current import.
    pub fn clear_all(&mut self) {
        if !self.network.is_owner() {
            self.network.request_ownership();
        }
        if !self.network.is_owner() {
            self.report(Status::warning("Could not take control of the board"));
            return;
        }

        tracing::info!("Clearing all imported strokes");
        self.clear_local();
        self.state.current_url = None;
        self.state.has_ever_imported = false;
        self.last_loaded_url = None;
        self.caught_up = None;
        self.network.replicate(&self.state);
        self.report(Status::info("Cleared"));
    }

    /// Destroy one top-level imported node on this participant only.
    ///
    /// `id` is a group name such as `Group_FF0000`, or the width part of an
    /// ungrouped stroke's name (`0.010` matches `Line_Width0.010`).
    pub fn delete_group(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() {
            tracing::warn!("Empty group id given for deletion");
            self.report(Status::warning("No group given"));
            return false;
        }

        let stroke_name = format!("Line_Width{id}");
        let found = [Container::World, Container::Pickup]
            .into_iter()
            .find_map(|container| {
                self.renderer
                    .find_child(container, id)
                    .or_else(|| self.renderer.find_child(container, &stroke_name))
            });
        match found {
            Some(node) => {
                tracing::info!("Deleting imported {}", id);
                self.renderer.destroy(node);
                self.report(Status::info(format!("Deleted {id}")));
                true
            }
            None => {
                tracing::warn!("No imported group named {}", id);
                self.report(Status::warning(format!("{id} not found")));
                false
            }
        }
    }

    /// Abandon any load, clear everything and reset every participant.
    pub fn reset(&mut self) {
        if !self.network.is_owner() {
            self.network.request_ownership();
        }

        tracing::info!("Resetting board");
        self.transition(Phase::Idle);
        self.clear_local();
        if self.state.pickup_active {
            self.renderer.set_pickup_active(false);
        }
        self.state = ReplicatedState::default();
        self.last_loaded_url = None;
        self.caught_up = None;
        self.approved_url = None;
        if self.network.is_owner() {
            self.network.replicate(&self.state);
        }
        self.network.broadcast(BoardEvent::Reset);
        self.report(Status::info("Board was reset"));
    }

    /// Set the scale factor.
    ///
    /// A non-positive or non-finite value resets the scale to 1.0. Any
    /// change invalidates a pending size approval.
    pub fn set_scale(&mut self, scale: f32) {
        if !valid_scale(scale) {
            tracing::warn!("Invalid scale {}, resetting to 1.0", scale);
            self.scale = 1.0;
            self.approved_url = None;
            self.report(Status::warning("Invalid scale, reset to 1.0"));
            return;
        }
        if (scale - self.scale).abs() > SCALE_EPSILON {
            tracing::info!("Scale changed from {} to {}", self.scale, scale);
            self.scale = scale;
            if self.approved_url.take().is_some() {
                self.report(Status::info(format!(
                    "Scale set to {scale}; size will be checked again"
                )));
            } else {
                self.report(Status::info(format!("Scale set to {scale}")));
            }
        }
    }

    /// Set the scale factor from user text.
    pub fn set_scale_text(&mut self, text: &str) {
        match text.trim().parse::<f32>() {
            Ok(scale) => self.set_scale(scale),
            Err(_) => self.set_scale(f32::NAN),
        }
    }

    /// Toggle importing into the pickup container.
    pub fn set_pickup_mode(&mut self, enabled: bool) {
        if enabled && !self.renderer.has_pickup() {
            tracing::warn!("No pickup container available, staying world-fixed");
            self.pickup_mode = false;
            self.report(Status::warning("Pickup container unavailable"));
            return;
        }
        self.pickup_mode = enabled;
    }

    /// Show or hide the pickup container for everyone.
    pub fn set_pickup_active(&mut self, active: bool) {
        if !self.network.is_owner() {
            self.network.request_ownership();
        }
        if !self.network.is_owner() {
            self.report(Status::warning("Could not take control of the board"));
            return;
        }
        self.state.pickup_active = active;
        self.renderer.set_pickup_active(active);
        self.network.replicate(&self.state);
    }

    fn activate_pickup(&mut self) {
        self.renderer.set_pickup_active(true);
        if self.network.is_owner() {
            self.state.pickup_active = true;
            self.network.replicate(&self.state);
        }
    }

    fn catch_up(&mut self, now: Instant) -> Option<FetchRequest> {
        if !self.state.has_ever_imported {
            return None;
        }
        let locator = self.state.current_url.clone()?;
        if self.caught_up.as_ref() == Some(&locator) {
            return None;
        }
        if self.state.import_in_flight {
            tracing::debug!("Deferring catch-up of {} until its import settles", locator);
            return None;
        }
        if self.is_loading() {
            return None;
        }

        tracing::info!("Catching up with {}", locator);
        self.caught_up = Some(locator.clone());
        Some(self.start_load(locator, LoadOrigin::CatchUp, now))
    }

    fn start_load(&mut self, locator: Locator, origin: LoadOrigin, now: Instant) -> FetchRequest {
        let ticket = FetchTicket(self.next_ticket);
        self.next_ticket += 1;
        self.transition(Phase::Loading {
            ticket,
            locator: locator.clone(),
            started: now,
            origin,
        });
        self.report(Status::info(format!("Loading {locator}")));
        FetchRequest { ticket, locator }
    }

    fn accept_outcome(&mut self, ticket: FetchTicket) -> Option<(Locator, LoadOrigin)> {
        match &self.phase {
            Phase::Loading {
                ticket: pending,
                locator,
                origin,
                ..
            } if *pending == ticket => Some((locator.clone(), *origin)),
            _ => {
                tracing::debug!(
                    "Ignoring outcome of stale fetch {} while {}",
                    ticket,
                    self.phase.name()
                );
                None
            }
        }
    }

    fn needs_size_check(&self, locator: &Locator, origin: LoadOrigin) -> bool {
        if origin == LoadOrigin::CatchUp {
            tracing::debug!("Skipping size check for catch-up of {}", locator);
            return false;
        }
        if self.approved_url.as_ref() == Some(locator) {
            tracing::info!("Size of {} already confirmed", locator);
            return false;
        }
        true
    }

    fn time_out(&mut self) {
        tracing::error!(
            "Load timed out after {}s",
            self.settings.load_timeout.as_secs()
        );
        self.transition(Phase::TimedOut);
        self.report(Status::error(format!(
            "Load timed out after {}s",
            self.settings.load_timeout.as_secs()
        )));
        self.release_in_flight();
    }

    fn finish_load(&mut self) {
        self.transition(Phase::Idle);
        self.release_in_flight();
    }

    fn release_in_flight(&mut self) {
        if self.network.is_owner() && self.state.import_in_flight {
            self.state.import_in_flight = false;
            self.network.replicate(&self.state);
        }
    }

    fn clear_local(&mut self) {
        self.renderer.clear(Container::World);
        self.renderer.clear(Container::Pickup);
    }

    fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            scale: self.scale,
            placement: if self.pickup_mode {
                Placement::Pickup
            } else {
                Placement::WorldFixed
            },
            grouping: if self.settings.group_by_color {
                Grouping::Color
            } else {
                Grouping::None
            },
            layer: self.settings.line_layer,
        }
    }

    fn transition(&mut self, next: Phase) {
        tracing::debug!("Board {} -> {}", self.phase.name(), next.name());
        self.phase = next;
    }

    fn report(&mut self, status: Status) {
        tracing::debug!("Status: {}", status);
        self.statuses.push(status);
    }
}

fn valid_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{FetchError, SoloNetwork};
    use crate::board::Severity;
    use crate::render::SceneGraph;

    const SMALL: &str = r#"{"timestamp":"t1","exportedData":[{"color":{"type":"const","value":["FF0000"]},"width":0.01,"positions":[0,0,0, 1,0,0, 1,1,0]}]}"#;
    const LARGE: &str = r#"{"timestamp":"t2","exportedData":[{"color":{"type":"const","value":["00FF00"]},"width":0.01,"positions":[0,0,0, 10,0,0]}]}"#;

    fn solo() -> ImportController<SoloNetwork, SceneGraph> {
        ImportController::new(SoloNetwork, SceneGraph::default(), ImportSettings::default())
    }

    fn locator(text: &str) -> Locator {
        Locator::parse(text).unwrap()
    }

    #[test]
    fn test_request_then_success_imports() {
        let mut board = solo();
        let now = Instant::now();

        let request = board.request_import(locator("a.json"), now).unwrap();
        assert!(board.is_loading());
        assert!(board.state().import_in_flight);
        assert!(board.state().has_ever_imported);

        let report = board.on_fetch_success(request.ticket, SMALL).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(board.phase(), &Phase::Idle);
        assert!(!board.state().import_in_flight);
        assert_eq!(board.renderer().stroke_count(), 1);
        assert_eq!(board.status().unwrap().severity, Severity::Success);
        assert_eq!(board.last_loaded_url(), Some(&locator("a.json")));
    }

    #[test]
    fn test_refused_while_loading() {
        let mut board = solo();
        let now = Instant::now();
        board.request_import(locator("a.json"), now).unwrap();

        assert!(board.request_import(locator("b.json"), now).is_none());
        assert_eq!(board.status().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_size_gate_then_confirm() {
        let mut board = solo();
        let now = Instant::now();

        let first = board.request_import(locator("big.json"), now).unwrap();
        assert!(board.on_fetch_success(first.ticket, LARGE).is_none());
        assert_eq!(board.renderer().stroke_count(), 0);
        assert_eq!(board.approved_url(), Some(&locator("big.json")));
        assert!(board.status().unwrap().message.contains("Reload to confirm"));
        assert!(!board.state().import_in_flight);

        let second = board.request_import(locator("big.json"), now).unwrap();
        let report = board.on_fetch_success(second.ticket, LARGE).unwrap();
        assert_eq!(report.created, 1);
    }

    #[test]
    fn test_scale_change_invalidates_approval() {
        let mut board = solo();
        let now = Instant::now();

        let first = board.request_import(locator("big.json"), now).unwrap();
        board.on_fetch_success(first.ticket, LARGE);
        assert!(board.approved_url().is_some());

        board.set_scale(0.6);
        assert!(board.approved_url().is_none());
        // 10 units at 0.6 is still over the limit.
        let second = board.request_import(locator("big.json"), now).unwrap();
        assert!(board.on_fetch_success(second.ticket, LARGE).is_none());

        board.set_scale(0.6004);
        assert!(board.approved_url().is_some());
    }

    #[test]
    fn test_scale_text() {
        let mut board = solo();
        board.set_scale_text(" 2.5 ");
        assert_eq!(board.scale(), 2.5);

        board.set_scale_text("abc");
        assert_eq!(board.scale(), 1.0);
        assert_eq!(board.status().unwrap().severity, Severity::Warning);

        board.set_scale(-3.0);
        assert_eq!(board.scale(), 1.0);
    }

    #[test]
    fn test_decode_error_releases_flag() {
        let mut board = solo();
        let request = board.request_import(locator("a.json"), Instant::now()).unwrap();

        assert!(board.on_fetch_success(request.ticket, "{\"x\":1}").is_none());
        assert_eq!(board.phase(), &Phase::Idle);
        assert!(!board.state().import_in_flight);
        assert_eq!(board.status().unwrap().severity, Severity::Error);
    }

    #[test]
    fn test_empty_payload_is_nothing_to_import() {
        let mut board = solo();
        let request = board.request_import(locator("a.json"), Instant::now()).unwrap();

        let empty = r#"{"timestamp":"t","exportedData":[]}"#;
        assert!(board.on_fetch_success(request.ticket, empty).is_none());
        assert_eq!(board.phase(), &Phase::Idle);
        assert!(!board.state().import_in_flight);
        let status = board.status().unwrap();
        assert_eq!(status.severity, Severity::Warning);
        assert_eq!(status.message, "Nothing to import");
    }

    #[test]
    fn test_fetch_error() {
        let mut board = solo();
        let request = board.request_import(locator("a.json"), Instant::now()).unwrap();

        board.on_fetch_error(request.ticket, &FetchError::Empty);
        assert!(!board.is_loading());
        assert!(board.status().unwrap().message.contains("empty response body"));
    }

    #[test]
    fn test_tick_times_out_and_ghost_is_ignored() {
        let mut board = solo();
        let start = Instant::now();
        let request = board.request_import(locator("a.json"), start).unwrap();

        assert!(board.tick(start + Duration::from_secs(29)).is_none());
        assert!(board.is_loading());

        assert_eq!(board.tick(start + Duration::from_secs(30)), Some(request.ticket));
        assert_eq!(board.phase(), &Phase::TimedOut);
        assert!(!board.state().import_in_flight);
        assert_eq!(board.status().unwrap().message, "Load timed out after 30s");

        assert!(board.on_fetch_success(request.ticket, SMALL).is_none());
        assert_eq!(board.renderer().stroke_count(), 0);
        assert_eq!(board.phase(), &Phase::TimedOut);

        board.tick(start + Duration::from_secs(31));
        assert_eq!(board.phase(), &Phase::Idle);
    }

    #[test]
    fn test_reload() {
        let mut board = solo();
        let now = Instant::now();
        assert!(board.reload(now).is_none());
        assert_eq!(board.status().unwrap().message, "Nothing to reload");

        let request = board.request_import(locator("a.json"), now).unwrap();
        board.on_fetch_success(request.ticket, SMALL);
        let again = board.reload(now).unwrap();
        assert_eq!(again.locator, locator("a.json"));
        assert_ne!(again.ticket, request.ticket);
    }

    #[test]
    fn test_clear_all() {
        let mut board = solo();
        let request = board.request_import(locator("a.json"), Instant::now()).unwrap();
        board.on_fetch_success(request.ticket, SMALL);

        board.clear_all();
        assert_eq!(board.renderer().stroke_count(), 0);
        assert!(board.state().current_url.is_none());
        assert!(!board.state().has_ever_imported);
        assert!(board.last_loaded_url().is_none());
    }

    #[test]
    fn test_delete_group() {
        let mut board = solo();
        let request = board.request_import(locator("a.json"), Instant::now()).unwrap();
        board.on_fetch_success(request.ticket, SMALL);
        let replicated = board.state().clone();

        assert!(!board.delete_group("Group_00FF00"));
        assert_eq!(board.status().unwrap().severity, Severity::Warning);

        assert!(board.delete_group("Group_FF0000"));
        assert_eq!(board.renderer().stroke_count(), 0);
        assert_eq!(board.state(), &replicated);
    }

    #[test]
    fn test_delete_ungrouped_stroke_by_width() {
        let mut board = ImportController::new(
            SoloNetwork,
            SceneGraph::default(),
            ImportSettings {
                group_by_color: false,
                ..ImportSettings::default()
            },
        );
        let request = board.request_import(locator("a.json"), Instant::now()).unwrap();
        board.on_fetch_success(request.ticket, SMALL);

        assert!(board.delete_group(" 0.010 "));
        assert_eq!(board.renderer().stroke_count(), 0);
        assert!(!board.delete_group(""));
    }

    #[test]
    fn test_reset_abandons_load() {
        let mut board = solo();
        let request = board.request_import(locator("a.json"), Instant::now()).unwrap();

        board.reset();
        assert_eq!(board.phase(), &Phase::Idle);
        assert_eq!(board.state(), &ReplicatedState::default());
        assert!(board.on_fetch_success(request.ticket, SMALL).is_none());
        assert_eq!(board.renderer().stroke_count(), 0);
    }

    #[test]
    fn test_pickup_mode_import() {
        let mut board = solo();
        board.set_pickup_mode(true);
        let request = board.request_import(locator("a.json"), Instant::now()).unwrap();
        board.on_fetch_success(request.ticket, SMALL);

        assert!(board.state().pickup_active);
        assert!(board.renderer().pickup().active);
        assert_eq!(board.renderer().strokes_in(Container::Pickup).count(), 1);
    }

    #[test]
    fn test_pickup_mode_forced_off_without_container() {
        let mut board = ImportController::new(
            SoloNetwork,
            SceneGraph::default().without_pickup(),
            ImportSettings {
                pickup_mode: true,
                ..ImportSettings::default()
            },
        );
        assert!(!board.pickup_mode());
        board.set_pickup_mode(true);
        assert!(!board.pickup_mode());
    }

    #[test]
    fn test_invalid_initial_scale() {
        let board = ImportController::new(
            SoloNetwork,
            SceneGraph::default(),
            ImportSettings {
                scale: 0.0,
                ..ImportSettings::default()
            },
        );
        assert_eq!(board.scale(), 1.0);
    }
}
