#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

use crate::domain::models::Genre;
use crate::domain::models::ResumeProtocol;
use crate::domain::models::StoryLength;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    #[strum(serialize = "backend-url")]
    BackendURL,
    BackendHealthCheckTimeout,
    ConfigFile,
    ResumeProtocol,
    #[strum(serialize = "thread-id")]
    ThreadID,
    StoryId,
    StoryTitle,
    StoryLength,
    ChapterLength,
    Genre,
    AdditionalNotes,
    MainCharacters,
    PlotIdeas,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn default(key: ConfigKey) -> String {
        if key == ConfigKey::ConfigFile {
            #[cfg(not(target_os = "macos"))]
            let config_dir = dirs::config_dir();
            #[cfg(target_os = "macos")]
            let config_dir = std::env::var("HOME")
                .ok()
                .map(|home| return path::PathBuf::from(home).join(".config"));

            return config_dir
                .unwrap_or_else(|| return path::PathBuf::from("."))
                .join("talemachine/config.toml")
                .to_string_lossy()
                .to_string();
        }

        let default_protocol = ResumeProtocol::Approval.to_string();
        let default_length = StoryLength::Medium.to_string();
        let default_genre = Genre::Fantasy.to_string();

        let res = match key {
            ConfigKey::BackendURL => "http://localhost:7890",
            ConfigKey::BackendHealthCheckTimeout => "1000",
            ConfigKey::ResumeProtocol => &default_protocol,
            ConfigKey::StoryLength => &default_length,
            ConfigKey::ChapterLength => &default_length,
            ConfigKey::Genre => &default_genre,

            // Optional
            ConfigKey::StoryId => "",
            ConfigKey::StoryTitle => "",
            ConfigKey::AdditionalNotes => "",
            ConfigKey::MainCharacters => "",
            ConfigKey::PlotIdeas => "",

            // Special
            ConfigKey::ConfigFile => "",
            ConfigKey::ThreadID => "",
        };

        return res.to_string();
    }

    /// Loads defaults, then the config file, then CLI flags and environment
    /// variables, each layer overriding the last.
    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Some(arg_config_file) =
                matches.get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if let Some(val) = doc.get(&key.to_string()) {
                    // Use clap value parsers to do validation.
                    let mut possible_values = vec![];
                    if let Some(arg) = cmd
                        .get_arguments()
                        .find(|e| return e.get_long() == Some(key.to_string().as_str()))
                    {
                        possible_values = arg
                            .get_possible_values()
                            .iter()
                            .map(|e| return e.get_name().to_string())
                            .collect::<Vec<String>>();
                    }

                    if let Some(val_int) = val.as_integer() {
                        Config::set(key, &val_int.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        if !possible_values.is_empty()
                            && !possible_values.contains(&val_str.to_string())
                        {
                            bail!(format!("config.toml has an invalid value for key '{key}': {val_str}\nPossible values are: {}", possible_values.join(", ")));
                        }
                        Config::set(key, val_str);
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::set(key, val)
                }
            }
        }

        tracing::debug!(
            backend_url = Config::get(ConfigKey::BackendURL),
            resume_protocol = Config::get(ConfigKey::ResumeProtocol),
            thread_id = Config::get(ConfigKey::ThreadID),
            story_id = Config::get(ConfigKey::StoryId),
            genre = Config::get(ConfigKey::Genre),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ThreadID || key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default()
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                if !arg.get_possible_values().is_empty() {
                    let possible_values = arg
                        .get_possible_values()
                        .iter()
                        .map(|e| return e.get_name())
                        .collect::<Vec<_>>()
                        .join(", ");
                    description = format!("{description} [possible values: {}]", possible_values);
                }

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i32>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
