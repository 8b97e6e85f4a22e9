//! Envelope command implementation.

use anyhow::{Context, Result};

use inkport_core::board::SoloNetwork;
use inkport_core::codec;
use inkport_core::export::{Exporter, InkPool};

use super::EnvelopeArgs;

/// Run the envelope command.
pub async fn run(args: EnvelopeArgs) -> Result<()> {
    let config = super::load_config();

    let text = tokio::fs::read_to_string(&args.payload)
        .await
        .with_context(|| format!("Failed to read {}", args.payload.display()))?;
    let decoded = codec::decode(&text, config.import.default_width)
        .with_context(|| format!("{} is not a valid payload", args.payload.display()))?;
    for skipped in &decoded.skipped {
        tracing::warn!("Dropping {}", skipped);
    }

    let mut pool = InkPool::new(decoded.payload.strokes);
    if let Some(width) = config.export.tool_width {
        pool = pool.with_tool_width(width);
    }

    let exporter = Exporter::new(&config.export);
    let pools = [pool];
    let export = if args.keep_timestamp {
        exporter.export_at(&mut SoloNetwork, &pools, decoded.payload.timestamp)?
    } else {
        exporter.export(&mut SoloNetwork, &pools)?
    };

    if args.per_stroke {
        for line in export.stroke_lines(exporter.log_tag())? {
            println!("{}", line);
        }
    } else {
        println!("{}", export.envelope);
    }

    Ok(())
}
