//! Command-line entry point: parse arguments and dispatch.

use anyhow::Result;

use eyeshade::args::{self, CliAction, ParsedArgs};
use eyeshade::commands;
use eyeshade::common::constants::EXIT_FAILURE;
use eyeshade::Eyeshade;

fn main() -> Result<()> {
    let parsed_args = ParsedArgs::from_env();

    match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::HelpCommand { command } => commands::help::run_help_command(command.as_deref()),
        CliAction::Run {
            debug_enabled,
            config_dir,
            log_file,
        } => {
            eyeshade::config::set_config_dir(config_dir)?;
            Eyeshade::new(debug_enabled).with_log_file(log_file).run()
        }
        CliAction::PresetCommand {
            debug_enabled,
            preset_name,
            config_dir,
        } => {
            eyeshade::logger::Log::set_debug(debug_enabled);
            eyeshade::config::set_config_dir(config_dir)?;
            commands::preset::handle_preset_command(&preset_name)
        }
        CliAction::SunCommand {
            debug_enabled,
            config_dir,
        } => {
            eyeshade::logger::Log::set_debug(debug_enabled);
            eyeshade::config::set_config_dir(config_dir)?;
            commands::sun::handle_sun_command()
        }
    }
}
