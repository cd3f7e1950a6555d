#[cfg(test)]
#[path = "story_test.rs"]
mod tests;

use std::str::FromStr;

use anyhow::bail;
use anyhow::Result;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::EnumString;
use strum::EnumVariantNames;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, EnumVariantNames, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoryLength {
    Short,
    Medium,
    Long,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, EnumVariantNames, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Genre {
    #[serde(rename = "sci-fi")]
    #[strum(serialize = "sci-fi")]
    SciFi,
    Action,
    Drama,
    Comedy,
    Mystery,
    Thriller,
    Romance,
    #[serde(rename = "young_adult")]
    #[strum(serialize = "young_adult")]
    YoungAdult,
    Fantasy,
    Children,
    Memoir,
    Historical,
    Poetry,
}

/// The story a session writes into. Every turn sends its metadata along so the
/// backend can keep chapters consistent with the chosen shape and genre.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    pub title: String,
    pub story_length: StoryLength,
    pub chapter_length: StoryLength,
    pub genre: Genre,
    pub additional_notes: Option<String>,
    pub main_characters: Option<String>,
    pub plot_ideas: Option<String>,
}

fn optional<F: Fn(ConfigKey) -> String>(get: &F, key: ConfigKey) -> Option<String> {
    let val = get(key);
    if val.trim().is_empty() {
        return None;
    }

    return Some(val);
}

fn parse_key<T: FromStr, F: Fn(ConfigKey) -> String>(get: &F, key: ConfigKey) -> Result<T> {
    let val = get(key);
    if let Ok(res) = T::from_str(&val) {
        return Ok(res);
    }

    bail!(format!("Invalid value for '{key}': {val}"));
}

impl Story {
    /// Builds the current story from configuration. Returns `None` when no
    /// story id was configured.
    pub fn from_config() -> Result<Option<Story>> {
        return Story::from_lookup(Config::get);
    }

    pub fn from_lookup<F: Fn(ConfigKey) -> String>(get: F) -> Result<Option<Story>> {
        let id_str = get(ConfigKey::StoryId);
        if id_str.trim().is_empty() {
            return Ok(None);
        }

        let id = match id_str.trim().parse::<i64>() {
            Ok(id) => id,
            Err(_) => bail!(format!("Story ID must be an integer, got: {id_str}")),
        };

        let mut title = get(ConfigKey::StoryTitle);
        if title.trim().is_empty() {
            title = format!("Story {id}");
        }

        return Ok(Some(Story {
            id,
            title,
            story_length: parse_key(&get, ConfigKey::StoryLength)?,
            chapter_length: parse_key(&get, ConfigKey::ChapterLength)?,
            genre: parse_key(&get, ConfigKey::Genre)?,
            additional_notes: optional(&get, ConfigKey::AdditionalNotes),
            main_characters: optional(&get, ConfigKey::MainCharacters),
            plot_ideas: optional(&get, ConfigKey::PlotIdeas),
        }));
    }
}
