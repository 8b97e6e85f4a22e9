//! Inspect command implementation.

use anyhow::Result;

use inkport_core::board::{gate, AnyFetcher, Fetcher, FetchError, GateDecision, Locator};
use inkport_core::codec;
use inkport_core::preview;

use super::InspectArgs;
use crate::ui;

/// Run the inspect command.
pub async fn run(args: InspectArgs) -> Result<()> {
    let config = super::load_config();
    let locator = Locator::parse(&args.locator)?;
    let scale = args.scale.unwrap_or(config.import.scale);

    let limit = config.import.load_timeout;
    let text = tokio::time::timeout(limit, AnyFetcher::new().fetch(&locator))
        .await
        .unwrap_or(Err(FetchError::Timeout(limit)))
        .map_err(inkport_core::Error::from)
        .inspect_err(ui::handle_error)?;

    let decoded = codec::decode(&text, config.import.default_width)
        .map_err(inkport_core::Error::from)
        .inspect_err(ui::handle_error)?;
    let summary = preview::summarize(&decoded.payload);
    let decision = gate::check(&decoded.payload, scale, config.import.max_bounding_size);

    if args.json {
        let output = serde_json::json!({
            "locator": locator.as_str(),
            "scale": scale,
            "longest_side": summary.longest_side(scale),
            "needs_confirmation": matches!(decision, GateDecision::Exceeded { .. }),
            "skipped": decoded.skipped.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    ui::print_summary(&summary, scale);
    for skipped in &decoded.skipped {
        println!("  Skipped {}", skipped);
    }
    if let GateDecision::Exceeded { longest_side } = decision {
        println!();
        println!(
            "  {:.1} units across at scale {}; import needs --confirm (limit {:.1})",
            longest_side, scale, config.import.max_bounding_size
        );
    }
    println!();

    Ok(())
}
