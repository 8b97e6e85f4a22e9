//! # Inkport Core Library
//!
//! `inkport-core` captures freehand 3D ink strokes as a portable text
//! payload and re-materializes them later, either inside a shared session
//! (with ownership arbitration and late-joiner catch-up) or offline.
//!
//! ## Features
//!
//! - **Deterministic codec**: strokes with solid or gradient colors, widths
//!   and positions to and from a JSON session payload
//! - **Transport envelope**: base64 lines bounded by `[START]`/`[END]`
//!   markers, recoverable from noisy log output
//! - **Shared import state machine**: one accepted import per board,
//!   size gate with one-shot approval, timeouts and catch-up
//! - **Materializer**: recentering, scaling, grouping and width resources
//!   handed to an external stroke renderer
//!
//! ## Modules
//!
//! - [`board`] - Replicated import state machine and its async driver
//! - [`codec`] - Stroke payload encoding and schema-validating decoding
//! - [`config`] - Configuration management
//! - [`envelope`] - Transport envelope wrapping and log extraction
//! - [`export`] - Stroke exporter over live stroke sources
//! - [`materialize`] - Turning decoded strokes into renderer objects
//! - [`preview`] - Payload summaries grouped by color
//! - [`render`] - Rendering boundary and an in-memory scene graph
//!
//! ## Example
//!
//! ```rust,ignore
//! use inkport_core::codec;
//!
//! let decoded = codec::decode(&text, 0.005)?;
//! println!("{} strokes from {}", decoded.payload.strokes.len(), decoded.payload.timestamp);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod board;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod export;
pub mod materialize;
pub mod preview;
pub mod render;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Width used when neither the payload nor the configuration supplies one.
pub const DEFAULT_STROKE_WIDTH: f32 = 0.005;

/// Longest bounding-box side (distance units) importable without confirmation.
pub const DEFAULT_MAX_BOUNDING_SIZE: f32 = 5.0;

/// Wall-clock budget for one fetch, in seconds.
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 30;

/// Tag prefixed to every transport line emitted by the exporter.
pub const DEFAULT_LOG_TAG: &str = "[QVPEN_EXPORTER]";
