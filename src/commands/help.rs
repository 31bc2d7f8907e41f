//! `eyeshade help [COMMAND]`.

use anyhow::Result;

pub fn run_help_command(command: Option<&str>) -> Result<()> {
    match command {
        None => crate::args::display_help(),
        Some("preset") | Some("p") => super::preset::display_help(),
        Some("sun") => super::sun::display_help(),
        Some("help") => display_help_help(),
        Some(unknown) => {
            log_warning!("Unknown command: {unknown}");
            crate::args::display_help();
        }
    }
    Ok(())
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: eyeshade help [COMMAND]");
    log_block_start!("Examples:");
    log_indented!("eyeshade help");
    log_indented!("eyeshade help preset");
    log_end!();
}
