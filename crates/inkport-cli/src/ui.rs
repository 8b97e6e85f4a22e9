//! UI utilities for Inkport CLI.

use std::time::Duration;

use inkport_core::board::{Severity, Status};
use inkport_core::materialize::MaterializeReport;
use inkport_core::preview::Summary;

const RULE_WIDTH: usize = 60;

/// Print one status line from the import controller.
pub fn print_status(status: &Status) {
    let line = format!("  {} {}", severity_marker(status.severity), status.message);
    match status.severity {
        Severity::Warning | Severity::Error => eprintln!("{}", line),
        Severity::Info | Severity::Success => println!("{}", line),
    }
}

const fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "·",
        Severity::Success => "✓",
        Severity::Warning => "!",
        Severity::Error => "✗",
    }
}

/// Print a core error and its suggestion to stderr.
pub fn handle_error(err: &inkport_core::Error) {
    eprintln!("Error: {}", err);

    if let Some(suggestion) = err.suggestion() {
        eprintln!();
        eprintln!("Suggestion:");
        for line in suggestion.lines() {
            eprintln!("  {}", line);
        }
    }
}

/// Print a payload summary as a table.
pub fn print_summary(summary: &Summary, scale: f32) {
    println!();
    println!("Payload {}", summary.timestamp);
    println!("{}", "─".repeat(RULE_WIDTH));
    println!(
        "  {:20}  {:7}  {:9}  {:7}  {}",
        "Group", "Strokes", "Gradients", "Points", "Widths"
    );
    println!("{}", "─".repeat(RULE_WIDTH));

    for group in &summary.groups {
        let gradients = if group.gradients > 0 {
            format!("{} ({})", group.gradients, group.max_stops)
        } else {
            "-".to_string()
        };
        println!(
            "  {:20}  {:7}  {:9}  {:7}  {}",
            group.label,
            group.strokes,
            gradients,
            group.points,
            format_widths(&group.widths)
        );
    }

    println!("{}", "─".repeat(RULE_WIDTH));
    println!("  {} strokes, {} points", summary.strokes, summary.points);
    if let Some(bounds) = summary.bounds {
        let size = bounds.size() * scale.abs();
        println!(
            "  Size at scale {}: {:.2} x {:.2} x {:.2}",
            scale, size.x, size.y, size.z
        );
    }
}

/// Print the outcome of a successful import.
pub fn print_report(report: &MaterializeReport) {
    println!();
    println!(
        "  Created {} strokes in {} groups using {} width resources",
        report.created, report.groups, report.resources
    );
    if report.failed > 0 {
        println!("  {} strokes could not be configured", report.failed);
    }
    println!();
}

/// Format widths as a compact list, e.g. "0.005, 0.010".
pub fn format_widths(widths: &[f32]) -> String {
    match widths {
        [] => "-".to_string(),
        [single] => format!("{:.3}", single),
        _ => widths
            .iter()
            .map(|w| format!("{:.3}", w))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Format a duration the way the configuration file spells it.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs > 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
