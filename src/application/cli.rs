use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use super::repl::help_text;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Genre;
use crate::domain::models::ResumeProtocol;
use crate::domain::models::StoryLength;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

pub fn log_dir() -> path::PathBuf {
    if let Ok(dir) = std::env::var("TALEMACHINE_LOG_DIR") {
        return path::PathBuf::from(dir);
    }

    return dirs::cache_dir()
        .unwrap_or_else(|| return path::PathBuf::from("."))
        .join("talemachine");
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for TaleMachine")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running TaleMachine with environment variable RUST_LOG=talemachine")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn subcommand_chat() -> Command {
    return Command::new("chat").about("Start a new story session.");
}

fn arg_config(key: ConfigKey, env: &str, help: &str) -> Arg {
    let mut arg = Arg::new(key.to_string())
        .long(key.to_string())
        .env(env.to_string())
        .num_args(1)
        .global(true);

    let default = Config::default(key);
    if default.is_empty() {
        arg = arg.help(help.to_string());
    } else {
        arg = arg.help(format!("{help} [default: {default}]"));
    }

    return arg;
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("talemachine")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .arg(
            arg_config(ConfigKey::ConfigFile, "TALEMACHINE_CONFIG_FILE", "Path to configuration file")
                .short('c'),
        )
        .arg(
            arg_config(ConfigKey::BackendURL, "TALEMACHINE_BACKEND_URL", "TaleMachine backend URL.")
                .short('u'),
        )
        .arg(arg_config(
            ConfigKey::BackendHealthCheckTimeout,
            "TALEMACHINE_BACKEND_HEALTH_CHECK_TIMEOUT",
            "Time to wait in milliseconds before timing out when doing a healthcheck for the backend.",
        ))
        .arg(
            arg_config(
                ConfigKey::ResumeProtocol,
                "TALEMACHINE_RESUME_PROTOCOL",
                "Shape of the resume request sent after approving or rejecting a paused action.",
            )
            .value_parser(PossibleValuesParser::new(ResumeProtocol::VARIANTS)),
        )
        .arg(arg_config(
            ConfigKey::ThreadID,
            "TALEMACHINE_THREAD_ID",
            "Attach to an existing backend thread instead of starting a new one.",
        ))
        .arg(
            arg_config(ConfigKey::StoryId, "TALEMACHINE_STORY_ID", "ID of the story to write into.")
                .short('s'),
        )
        .arg(arg_config(
            ConfigKey::StoryTitle,
            "TALEMACHINE_STORY_TITLE",
            "Title of the story, sent as the story name.",
        ))
        .arg(
            arg_config(ConfigKey::StoryLength, "TALEMACHINE_STORY_LENGTH", "Overall length of the story.")
                .value_parser(PossibleValuesParser::new(StoryLength::VARIANTS)),
        )
        .arg(
            arg_config(ConfigKey::ChapterLength, "TALEMACHINE_CHAPTER_LENGTH", "Length of each chapter.")
                .value_parser(PossibleValuesParser::new(StoryLength::VARIANTS)),
        )
        .arg(
            arg_config(ConfigKey::Genre, "TALEMACHINE_GENRE", "Genre of the story.")
                .short('g')
                .value_parser(PossibleValuesParser::new(Genre::VARIANTS)),
        )
        .arg(arg_config(
            ConfigKey::AdditionalNotes,
            "TALEMACHINE_ADDITIONAL_NOTES",
            "Free-form notes for the writer.",
        ))
        .arg(arg_config(
            ConfigKey::MainCharacters,
            "TALEMACHINE_MAIN_CHARACTERS",
            "Who the story is about.",
        ))
        .arg(arg_config(
            ConfigKey::PlotIdeas,
            "TALEMACHINE_PLOT_IDEAS",
            "Plot ideas to steer the story.",
        ));
}

/// Parses the command line. Returns false when a subcommand already did all
/// the work and no session should start.
pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    println!("{}", log_dir().join("debug.log").to_string_lossy());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }

            return Ok(false);
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(true);
}
