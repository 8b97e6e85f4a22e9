//! Shared import board.
//!
//! A board is the replicated entity that owns import state for one shared
//! drawing surface. Every participant runs its own [`ImportController`];
//! only the owner mutates the [`ReplicatedState`], and every participant
//! fetches, decodes and materializes strokes locally when told to.
//!
//! The host supplies the session plumbing through [`Network`] and the
//! scene through [`StrokeRenderer`](crate::render::StrokeRenderer).
//! [`runtime::BoardRuntime`] drives a controller on tokio, running fetches
//! with a timeout and routing their completions back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod controller;
pub mod fetch;
pub mod gate;
pub mod runtime;

pub use controller::{FetchRequest, FetchTicket, ImportController, ImportSettings, LoadOrigin, Phase};
pub use fetch::{AnyFetcher, FetchError, Fetcher, FileFetcher};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use gate::{Bounds, GateDecision};
pub use runtime::BoardRuntime;

use crate::error::{Error, Result};

/// Address of a session payload: a URL or a local path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Parse a locator, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLocator`] if the text is empty.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidLocator("locator is empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Locator text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL scheme, lowercased, if the locator has one.
    #[must_use]
    pub fn scheme(&self) -> Option<String> {
        let (scheme, _) = self.0.split_once("://")?;
        if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') {
            Some(scheme.to_ascii_lowercase())
        } else {
            None
        }
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a participant in a shared session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant {}", self.0)
    }
}

/// Board fields replicated from the owner to every participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicatedState {
    /// Locator of the most recently accepted import
    pub current_url: Option<Locator>,
    /// Whether anything has been imported since the last clear
    pub has_ever_imported: bool,
    /// Whether an accepted import is still being processed
    pub import_in_flight: bool,
    /// Whether the pickup container is shown
    pub pickup_active: bool,
}

/// Named events broadcast to every other participant.
///
/// Events may overtake the snapshot written just before them, so
/// `BeginImport` carries its own locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardEvent {
    /// Fetch, decode and materialize this locator
    BeginImport(Locator),
    /// Abandon loading and clear local strokes
    Reset,
}

/// How a status message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Progress or neutral information
    Info,
    /// An operation completed
    Success,
    /// Attention needed, nothing failed
    Warning,
    /// An operation failed
    Error,
}

/// A user-visible status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Message text
    pub message: String,
    /// Presentation severity
    pub severity: Severity,
}

impl Status {
    /// Create a status.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    /// Informational status.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Success status.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    /// Warning status.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Error status.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Session plumbing provided by the host.
///
/// Ownership is per board entity. `request_ownership` is treated as
/// synchronous: `is_owner` reflects the outcome immediately after.
pub trait Network {
    /// The participant this controller runs for.
    fn local_participant(&self) -> ParticipantId;

    /// Whether the local participant owns the board.
    fn is_owner(&self) -> bool;

    /// Ask to become the board's owner.
    fn request_ownership(&mut self);

    /// Propagate the owner's replicated state to every other participant.
    fn replicate(&mut self, state: &ReplicatedState);

    /// Invoke `event` on every other participant.
    fn broadcast(&mut self, event: BoardEvent);
}

/// A session with a single participant, who always owns the board.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloNetwork;

impl Network for SoloNetwork {
    fn local_participant(&self) -> ParticipantId {
        ParticipantId(1)
    }

    fn is_owner(&self) -> bool {
        true
    }

    fn request_ownership(&mut self) {}

    fn replicate(&mut self, state: &ReplicatedState) {
        tracing::trace!("Replicating {:?}", state);
    }

    fn broadcast(&mut self, event: BoardEvent) {
        tracing::trace!("Broadcasting {:?}", event);
    }
}
