//! Stroke exporter.
//!
//! Reads live strokes through [`StrokeSource`], resolves their widths and
//! colors, and produces a session payload plus its transport line. Sources
//! are never mutated.

use chrono::Local;
use glam::Vec3;

use crate::board::Network;
use crate::codec::{self, Gradient, Rgb24, SessionPayload, StrokeColor, StrokeRecord, MIN_EXPLICIT_WIDTH};
use crate::config::ExportConfig;
use crate::envelope::{self, BEGIN_EXPORT_MARKER, END_EXPORT_MARKER, TIMESTAMP_FORMAT};
use crate::error::{Error, Result};

/// A live stroke that can be exported.
///
/// Colors are unit-range RGB channels.
pub trait StrokeSource {
    /// Current points of the stroke.
    fn positions(&self) -> Vec<Vec3>;

    /// Color at the start of the stroke.
    fn start_color(&self) -> [f32; 3];

    /// Gradient color keys, if the stroke carries a gradient.
    fn gradient_keys(&self) -> Option<Vec<[f32; 3]>> {
        None
    }

    /// Width set on the stroke itself; `0.0` when unset.
    fn width(&self) -> f32 {
        0.0
    }
}

/// Strokes drawn with one tool, sharing its configured width.
#[derive(Debug, Clone)]
pub struct InkPool<S> {
    /// Width configured on the tool, if any
    pub tool_width: Option<f32>,
    /// Strokes drawn with the tool
    pub strokes: Vec<S>,
}

impl<S> InkPool<S> {
    /// A pool without a tool width.
    pub fn new(strokes: Vec<S>) -> Self {
        Self {
            tool_width: None,
            strokes,
        }
    }

    /// Set the tool width.
    #[must_use]
    pub fn with_tool_width(mut self, width: f32) -> Self {
        self.tool_width = Some(width);
        self
    }
}

/// Result of one export.
#[derive(Debug, Clone)]
pub struct Export {
    /// Exported strokes
    pub payload: SessionPayload,
    /// Payload JSON text
    pub text: String,
    /// Transport line carrying the whole session
    pub envelope: String,
    /// Sources skipped for having fewer than two points
    pub skipped: usize,
}

impl Export {
    /// Per-stroke transport lines bracketed by export markers.
    ///
    /// # Errors
    ///
    /// Returns an error if a stroke fails to serialize.
    pub fn stroke_lines(&self, tag: &str) -> Result<Vec<String>> {
        let mut lines = Vec::with_capacity(self.payload.strokes.len() + 2);
        lines.push(format!("{tag} {BEGIN_EXPORT_MARKER}"));
        for stroke in &self.payload.strokes {
            lines.push(envelope::wrap(tag, &codec::encode_stroke(stroke)?));
        }
        lines.push(format!("{tag} {END_EXPORT_MARKER}"));
        Ok(lines)
    }
}

/// Exports live strokes.
#[derive(Debug, Clone)]
pub struct Exporter {
    default_pen_width: f32,
    log_tag: String,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(&ExportConfig::default())
    }
}

impl Exporter {
    /// Create an exporter from the `[export]` configuration.
    #[must_use]
    pub fn new(config: &ExportConfig) -> Self {
        let default_pen_width = if config.default_pen_width > MIN_EXPLICIT_WIDTH {
            config.default_pen_width
        } else {
            crate::DEFAULT_STROKE_WIDTH
        };
        Self {
            default_pen_width,
            log_tag: config.log_tag.clone(),
        }
    }

    /// Tag prefixed to transport lines.
    #[must_use]
    pub fn log_tag(&self) -> &str {
        &self.log_tag
    }

    /// Export every stroke of `pools`, stamped with the local time.
    ///
    /// Takes ownership of the exporting entity first if it is not held.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingToExport`] if no source has two points.
    pub fn export<N, S>(&self, network: &mut N, pools: &[InkPool<S>]) -> Result<Export>
    where
        N: Network + ?Sized,
        S: StrokeSource,
    {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.export_at(network, pools, timestamp)
    }

    /// Export with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingToExport`] if no source has two points.
    pub fn export_at<N, S>(
        &self,
        network: &mut N,
        pools: &[InkPool<S>],
        timestamp: impl Into<String>,
    ) -> Result<Export>
    where
        N: Network + ?Sized,
        S: StrokeSource,
    {
        if !network.is_owner() {
            tracing::debug!("Requesting ownership before export");
            network.request_ownership();
        }

        let mut strokes = Vec::new();
        let mut skipped = 0;
        for pool in pools {
            for source in &pool.strokes {
                match self.record(source, pool.tool_width) {
                    Some(record) => strokes.push(record),
                    None => skipped += 1,
                }
            }
        }

        if strokes.is_empty() {
            return Err(Error::NothingToExport(format!(
                "{} pools, {} sources without enough points",
                pools.len(),
                skipped
            )));
        }

        let payload = SessionPayload::new(timestamp, strokes);
        let text = codec::encode(&payload)?;
        let envelope = envelope::wrap(&self.log_tag, &text);
        tracing::info!(
            "Exported {} strokes ({} skipped)",
            payload.strokes.len(),
            skipped
        );

        Ok(Export {
            payload,
            text,
            envelope,
            skipped,
        })
    }

    /// Width for a stroke: its own, else its tool's, else the default.
    #[must_use]
    pub fn resolve_width(&self, explicit: f32, tool_width: Option<f32>) -> f32 {
        if explicit > MIN_EXPLICIT_WIDTH {
            return explicit;
        }
        match tool_width {
            Some(width) if width > MIN_EXPLICIT_WIDTH => width,
            _ => self.default_pen_width,
        }
    }

    fn record<S: StrokeSource>(&self, source: &S, tool_width: Option<f32>) -> Option<StrokeRecord> {
        let positions = source.positions();
        let width = self.resolve_width(source.width(), tool_width);
        match StrokeRecord::new(source_color(source), width, positions) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping stroke: {}", e);
                None
            }
        }
    }
}

/// Color of a source: its gradient if it has at least two keys, else a
/// solid color from the first key or the start color.
fn source_color<S: StrokeSource>(source: &S) -> StrokeColor {
    let start = unit_to_rgb(source.start_color());
    let Some(keys) = source.gradient_keys() else {
        return StrokeColor::Const(start);
    };

    let stops: Vec<Rgb24> = keys.into_iter().map(unit_to_rgb).collect();
    let first = stops.first().copied().unwrap_or(start);
    Gradient::new(stops).map_or(StrokeColor::Const(first), StrokeColor::Gradient)
}

fn unit_to_rgb([r, g, b]: [f32; 3]) -> Rgb24 {
    Rgb24::from_unit(r, g, b)
}

/// Decoded strokes can be exported again.
impl StrokeSource for StrokeRecord {
    fn positions(&self) -> Vec<Vec3> {
        Self::positions(self).to_vec()
    }

    fn start_color(&self) -> [f32; 3] {
        self.color().primary().to_unit()
    }

    fn gradient_keys(&self) -> Option<Vec<[f32; 3]>> {
        match self.color() {
            StrokeColor::Const(_) => None,
            StrokeColor::Gradient(gradient) => {
                Some(gradient.stops().iter().map(|c| c.to_unit()).collect())
            }
        }
    }

    fn width(&self) -> f32 {
        Self::width(self)
    }
}
