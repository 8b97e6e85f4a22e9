//! Config command implementation.

use anyhow::Result;

use inkport_core::config::Config;

use super::{ConfigAction, ConfigArgs};
use crate::ui::format_duration;

/// Run the config command.
pub fn run(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!();
            println!("Inkport Configuration");
            println!("{}", "─".repeat(50));
            println!();
            println!("[import]");
            println!("  default_width = {}", config.import.default_width);
            println!("  max_bounding_size = {}", config.import.max_bounding_size);
            println!(
                "  load_timeout = \"{}\"",
                format_duration(config.import.load_timeout)
            );
            println!(
                "  poll_interval = \"{}\"",
                format_duration(config.import.poll_interval)
            );
            println!("  scale = {}", config.import.scale);
            println!();
            println!("[export]");
            println!("  default_pen_width = {}", config.export.default_pen_width);
            match config.export.tool_width {
                Some(width) => println!("  tool_width = {}", width),
                None => println!("  # tool_width is unset"),
            }
            println!("  log_tag = \"{}\"", config.export.log_tag);
            println!();
            println!("[render]");
            println!("  pickup_enabled = {}", config.render.pickup_enabled);
            println!("  pickup_mode = {}", config.render.pickup_mode);
            println!("  line_layer = {}", config.render.line_layer);
            println!("  group_by_color = {}", config.render.group_by_color);
            println!();
        }

        ConfigAction::Path => {
            println!("{}", Config::config_path().display());
        }

        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("Configuration reset to defaults.");
        }
    }

    Ok(())
}
