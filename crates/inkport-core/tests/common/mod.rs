//! Common test utilities for `Inkport` integration tests.
//!
//! Provides a simulated multi-participant room: ownership of the board,
//! and an ordered queue of replicated snapshots and broadcast events.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use inkport_core::board::{
    BoardEvent, FetchRequest, ImportController, ImportSettings, Network, ParticipantId,
    ReplicatedState,
};
use inkport_core::render::SceneGraph;
use tokio::time::Instant;

/// Something sent through the room.
#[derive(Debug, Clone)]
pub enum Message {
    /// Owner's replicated state
    Snapshot(ReplicatedState),
    /// Broadcast event
    Event(BoardEvent),
}

#[derive(Debug, Default)]
struct Room {
    owner: Option<ParticipantId>,
    queue: VecDeque<(ParticipantId, Message)>,
    replications: usize,
}

/// One participant's view of the room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room: Rc<RefCell<Room>>,
    me: ParticipantId,
}

impl Network for RoomHandle {
    fn local_participant(&self) -> ParticipantId {
        self.me
    }

    fn is_owner(&self) -> bool {
        self.room.borrow().owner == Some(self.me)
    }

    fn request_ownership(&mut self) {
        self.room.borrow_mut().owner = Some(self.me);
    }

    fn replicate(&mut self, state: &ReplicatedState) {
        let mut room = self.room.borrow_mut();
        if room.owner == Some(self.me) {
            room.replications += 1;
            room.queue.push_back((self.me, Message::Snapshot(state.clone())));
        }
    }

    fn broadcast(&mut self, event: BoardEvent) {
        self.room
            .borrow_mut()
            .queue
            .push_back((self.me, Message::Event(event)));
    }
}

/// A controller running in the simulated room.
pub type Board = ImportController<RoomHandle, SceneGraph>;

/// A fetch some participant asked for.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    /// Who asked
    pub participant: ParticipantId,
    /// What to fetch
    pub request: FetchRequest,
}

/// A shared session with several participants.
pub struct Session {
    room: Rc<RefCell<Room>>,
    boards: BTreeMap<ParticipantId, Board>,
    next_id: u32,
    settings: ImportSettings,
}

impl Session {
    /// Create a session with `participants` members.
    pub fn new(participants: u32) -> Self {
        let mut session = Self {
            room: Rc::new(RefCell::new(Room::default())),
            boards: BTreeMap::new(),
            next_id: 1,
            settings: ImportSettings::default(),
        };
        for _ in 0..participants {
            session.add();
        }
        session
    }

    fn add(&mut self) -> ParticipantId {
        let id = ParticipantId(self.next_id);
        self.next_id += 1;
        let handle = RoomHandle {
            room: Rc::clone(&self.room),
            me: id,
        };
        self.boards.insert(
            id,
            ImportController::new(handle, SceneGraph::default(), self.settings.clone()),
        );
        id
    }

    /// A participant's controller.
    pub fn board(&mut self, id: ParticipantId) -> &mut Board {
        self.boards.get_mut(&id).expect("unknown participant")
    }

    /// Current owner of the board.
    pub fn owner(&self) -> Option<ParticipantId> {
        self.room.borrow().owner
    }

    /// Hand ownership to `id`.
    pub fn set_owner(&mut self, id: ParticipantId) {
        self.room.borrow_mut().owner = Some(id);
    }

    /// Snapshots sent so far.
    pub fn replications(&self) -> usize {
        self.room.borrow().replications
    }

    /// Add a participant and announce the join to everyone.
    pub fn join(&mut self, now: Instant) -> (ParticipantId, Vec<PendingFetch>) {
        let id = self.add();
        let mut fetches = Vec::new();
        for (participant, board) in &mut self.boards {
            if let Some(request) = board.on_participant_joined(id, now) {
                fetches.push(PendingFetch {
                    participant: *participant,
                    request,
                });
            }
        }
        fetches.extend(self.pump(now));
        (id, fetches)
    }

    /// Remove a participant; ownership moves to the lowest remaining id.
    pub fn leave(&mut self, id: ParticipantId, now: Instant) -> Vec<PendingFetch> {
        self.boards.remove(&id);
        {
            let mut room = self.room.borrow_mut();
            if room.owner == Some(id) {
                room.owner = self.boards.keys().next().copied();
            }
        }
        let mut fetches = Vec::new();
        for (participant, board) in &mut self.boards {
            if let Some(request) = board.on_participant_left(id, now) {
                fetches.push(PendingFetch {
                    participant: *participant,
                    request,
                });
            }
        }
        fetches.extend(self.pump(now));
        fetches
    }

    /// Deliver every queued message to every participant but its sender.
    pub fn pump(&mut self, now: Instant) -> Vec<PendingFetch> {
        let mut fetches = Vec::new();
        loop {
            let next = self.room.borrow_mut().queue.pop_front();
            let Some((sender, message)) = next else {
                break;
            };
            fetches.extend(self.deliver(sender, &message, now));
        }
        fetches
    }

    /// Like [`Session::pump`], but the messages already queued arrive
    /// newest first.
    pub fn pump_reversed(&mut self, now: Instant) -> Vec<PendingFetch> {
        {
            let mut room = self.room.borrow_mut();
            let queued: Vec<_> = room.queue.drain(..).rev().collect();
            room.queue.extend(queued);
        }
        self.pump(now)
    }

    fn deliver(&mut self, sender: ParticipantId, message: &Message, now: Instant) -> Vec<PendingFetch> {
        let mut fetches = Vec::new();
        for (participant, board) in &mut self.boards {
            if *participant == sender {
                continue;
            }
            let request = match message {
                Message::Snapshot(state) => board.on_snapshot(state.clone(), now),
                Message::Event(event) => board.on_event(event.clone(), now),
            };
            if let Some(request) = request {
                fetches.push(PendingFetch {
                    participant: *participant,
                    request,
                });
            }
        }
        fetches
    }

    /// Complete fetches with `text`, then deliver the resulting messages.
    pub fn complete(&mut self, fetches: &[PendingFetch], text: &str, now: Instant) -> Vec<PendingFetch> {
        for fetch in fetches {
            if let Some(board) = self.boards.get_mut(&fetch.participant) {
                board.on_fetch_success(fetch.request.ticket, text);
            }
        }
        self.pump(now)
    }

    /// Stroke count in a participant's scene.
    pub fn strokes(&mut self, id: ParticipantId) -> usize {
        self.board(id).renderer().stroke_count()
    }
}

/// One red stroke, three points.
pub const SMALL_PAYLOAD: &str = r#"{"timestamp":"t1","exportedData":[{"color":{"type":"const","value":["FF0000"]},"width":0.01,"positions":[0,0,0, 1,0,0, 1,1,0]}]}"#;

/// Payload whose longest side is `extent` units.
pub fn payload_spanning(extent: f32) -> String {
    format!(
        r#"{{"timestamp":"t2","exportedData":[{{"color":{{"type":"const","value":["00FF00"]}},"width":0.01,"positions":[0,0,0, {extent},0,0]}},{{"color":{{"type":"const","value":["0000FF"]}},"width":0.02,"positions":[0,1,0, 1,1,0]}}]}}"#
    )
}

/// Payload of `count` strokes in alternating colors.
pub fn payload_with_strokes(count: usize) -> String {
    let strokes: Vec<String> = (0..count)
        .map(|i| {
            let color = if i % 2 == 0 { "FF0000" } else { "0000FF" };
            format!(
                r#"{{"color":{{"type":"const","value":["{color}"]}},"width":0.01,"positions":[{i},0,0, {i},1,0]}}"#
            )
        })
        .collect();
    format!(
        r#"{{"timestamp":"t3","exportedData":[{}]}}"#,
        strokes.join(",")
    )
}

/// Create a temporary directory for test files.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}
