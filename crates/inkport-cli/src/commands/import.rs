//! Import command implementation.

use anyhow::{bail, Context, Result};

use inkport_core::board::{
    AnyFetcher, BoardRuntime, ImportController, ImportSettings, Locator, SoloNetwork, Status,
};
use inkport_core::materialize::MaterializeReport;
use inkport_core::render::SceneGraph;

use super::ImportArgs;
use crate::ui;

/// A single-participant board fed from local files or URLs.
struct Session {
    runtime: BoardRuntime<SoloNetwork, SceneGraph, AnyFetcher>,
    json: bool,
    last_status: Option<Status>,
}

impl Session {
    async fn load(&mut self, locator: &Locator) -> Option<MaterializeReport> {
        let report = match self.runtime.request_import(locator.clone()) {
            Some(_) => self.runtime.settle().await,
            None => None,
        };
        self.flush_statuses();
        report
    }

    fn flush_statuses(&mut self) {
        for status in self.runtime.controller_mut().take_statuses() {
            if self.json {
                tracing::info!("{}", status.message);
            } else {
                ui::print_status(&status);
            }
            self.last_status = Some(status);
        }
    }

    fn awaiting_confirmation(&self, locator: &Locator) -> bool {
        self.runtime.controller().approved_url() == Some(locator)
    }

    fn print_json(&self, locator: &Locator, report: Option<&MaterializeReport>) -> Result<()> {
        let controller = self.runtime.controller();
        let output = serde_json::json!({
            "locator": locator.as_str(),
            "scale": controller.scale(),
            "pickup": controller.pickup_mode(),
            "imported": report.is_some(),
            "needs_confirmation": report.is_none() && self.awaiting_confirmation(locator),
            "created": report.map_or(0, |r| r.created),
            "failed": report.map_or(0, |r| r.failed),
            "groups": report.map_or(0, |r| r.groups),
            "resources": report.map_or(0, |r| r.resources),
            "status": self.last_status.as_ref().map(|s| s.message.clone()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

/// Run the import command.
pub async fn run(args: ImportArgs) -> Result<()> {
    let config = super::load_config();
    let locator = Locator::parse(&args.locator)?;

    let scene = if config.render.pickup_enabled {
        SceneGraph::default()
    } else {
        SceneGraph::default().without_pickup()
    };
    let controller = ImportController::new(
        SoloNetwork,
        scene,
        ImportSettings::from_config(&config),
    );
    let mut session = Session {
        runtime: BoardRuntime::new(controller, AnyFetcher::new(), config.import.poll_interval),
        json: args.json,
        last_status: None,
    };

    if let Some(scale) = args.scale {
        session.runtime.controller_mut().set_scale(scale);
    }
    if args.pickup {
        session.runtime.controller_mut().set_pickup_mode(true);
    }
    session.flush_statuses();

    let mut report = session.load(&locator).await;
    if report.is_none() && session.awaiting_confirmation(&locator) {
        if args.confirm {
            tracing::info!("Confirming large payload {}", locator);
            report = session.load(&locator).await;
        } else if !args.json {
            println!("  Re-run with --confirm to import it anyway.");
        }
    }

    let Some(report) = report else {
        if args.json {
            session.print_json(&locator, None)?;
        }
        if session.awaiting_confirmation(&locator) && !args.confirm {
            return Ok(());
        }
        bail!("Import of {} failed", locator);
    };

    if let Some(path) = &args.output {
        let scene = session.runtime.controller().renderer().to_json()?;
        tokio::fs::write(path, scene)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !args.json {
            println!("  Scene written to {}", path.display());
        }
    }

    if args.json {
        session.print_json(&locator, Some(&report))?;
    } else {
        ui::print_report(&report);
    }

    Ok(())
}
