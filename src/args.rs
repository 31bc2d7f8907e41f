//! Command-line argument parsing.
//!
//! Global flags (`--debug`, `--config DIR`, `--log FILE`) may appear anywhere.
//! The first bare word selects a subcommand; without one the engine runs.

/// What the process should do, as decided by the command line.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the engine in the foreground
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        log_file: Option<String>,
    },
    /// Write a display preset into the config file
    PresetCommand {
        debug_enabled: bool,
        preset_name: String,
        config_dir: Option<String>,
    },
    /// Print today's sunrise and sunset for the configured location
    SunCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// `help [COMMAND]`
    HelpCommand { command: Option<String> },
    ShowHelp,
    ShowVersion,
    /// Unknown or malformed arguments
    ShowHelpDueToError,
}

pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse `args`, where the first item is the program name.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut config_dir: Option<String> = None;
        let mut log_file: Option<String> = None;
        let mut positional: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args_vec.len() {
            let arg = args_vec[i].as_str();
            match arg {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--config" | "-c" | "--log" | "-l" => {
                    let Some(value) = args_vec.get(i + 1).filter(|v| !v.starts_with('-'))
                    else {
                        log_warning!("Missing value for {arg}");
                        return Self::error();
                    };
                    if matches!(arg, "--config" | "-c") {
                        config_dir = Some(value.clone());
                    } else {
                        log_file = Some(value.clone());
                    }
                    i += 1;
                }
                flag if flag.starts_with('-') => {
                    log_warning!("Unknown option: {flag}");
                    return Self::error();
                }
                word => positional.push(word.to_string()),
            }
            i += 1;
        }

        if display_version {
            return Self::action(CliAction::ShowVersion);
        }
        if display_help {
            return Self::action(CliAction::ShowHelp);
        }

        let mut words = positional.into_iter();
        let Some(command) = words.next() else {
            return Self::action(CliAction::Run {
                debug_enabled,
                config_dir,
                log_file,
            });
        };
        let rest: Vec<String> = words.collect();

        let action = match (command.as_str(), rest.as_slice()) {
            ("preset" | "p", [name]) => CliAction::PresetCommand {
                debug_enabled,
                preset_name: name.clone(),
                config_dir,
            },
            ("preset" | "p", []) => {
                log_warning!("Missing preset name. Usage: eyeshade preset <name>");
                CliAction::ShowHelpDueToError
            }
            ("sun", []) => CliAction::SunCommand {
                debug_enabled,
                config_dir,
            },
            ("help", []) => CliAction::HelpCommand { command: None },
            ("help", [topic]) => CliAction::HelpCommand {
                command: Some(topic.clone()),
            },
            ("version", []) => CliAction::ShowVersion,
            ("preset" | "p" | "sun" | "help" | "version", extra) => {
                log_warning!(
                    "Unexpected argument for {command}: {}",
                    extra.join(" ")
                );
                CliAction::ShowHelpDueToError
            }
            (unknown, _) => {
                log_warning!("Unknown command: {unknown}");
                CliAction::ShowHelpDueToError
            }
        };
        Self::action(action)
    }

    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }

    fn action(action: CliAction) -> ParsedArgs {
        ParsedArgs { action }
    }

    fn error() -> ParsedArgs {
        Self::action(CliAction::ShowHelpDueToError)
    }
}

pub fn display_version_info() {
    log_version!();
    log_block_start!("{}", env!("CARGO_PKG_DESCRIPTION"));
    log_end!();
}

pub fn display_help() {
    log_version!();
    log_block_start!("Usage: eyeshade [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <DIR>   Use a custom configuration directory");
    log_indented!("-d, --debug          Show detailed operation logs");
    log_indented!("-l, --log <FILE>     Also write the log to FILE");
    log_indented!("-h, --help           Print help information");
    log_indented!("-V, --version        Print version information");
    log_block_start!("Commands:");
    log_indented!("preset, p <name>     Apply a display preset to the config");
    log_indented!("sun                  Show sunrise and sunset for the configured location");
    log_indented!("help [COMMAND]       Show help for a command");
    log_pipe!();
    log_info!("Without a command eyeshade runs in the foreground until interrupted.");
    log_end!();
}
