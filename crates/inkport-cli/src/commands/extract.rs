//! Extract command implementation.

use anyhow::{Context, Result};

use inkport_core::codec;
use inkport_core::envelope::{self, ExtractedFrom};

use super::ExtractArgs;
use crate::ui;

/// Run the extract command.
pub async fn run(args: ExtractArgs) -> Result<()> {
    let config = super::load_config();

    let log = tokio::fs::read_to_string(&args.log)
        .await
        .with_context(|| format!("Failed to read {}", args.log.display()))?;

    let extraction = envelope::extract(&log).inspect_err(ui::handle_error)?;
    let decoded = codec::decode(&extraction.text, config.import.default_width)
        .map_err(inkport_core::Error::from)
        .inspect_err(ui::handle_error)?;

    let source = match extraction.from {
        ExtractedFrom::Session => "session",
        ExtractedFrom::Strokes => "per-stroke export",
    };

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &extraction.text)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Extracted {} strokes from {} to {}",
                decoded.payload.strokes.len(),
                source,
                path.display()
            );
            if extraction.skipped > 0 || !decoded.skipped.is_empty() {
                println!(
                    "  {} unreadable segments, {} invalid strokes",
                    extraction.skipped,
                    decoded.skipped.len()
                );
            }
        }
        None => println!("{}", extraction.text),
    }

    Ok(())
}
