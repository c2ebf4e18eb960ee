use std::{fs, path::Path};

use anyhow::{Context, Result};
use crystal_miner_core::{Campaign, LevelDefinition, LevelId};
use crystal_miner_system_session::GameConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    seed: Option<u64>,
    #[serde(default)]
    levels: Vec<LevelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelEntry {
    id: u32,
    max_number: u32,
    time_limit_secs: u32,
    base_xp: u32,
}

/// Loads the game configuration, falling back to the built-in campaign
/// when no file is given.
pub(crate) fn load(path: Option<&Path>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read campaign config at {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid campaign config at {}", path.display()))
}

fn parse(contents: &str) -> Result<GameConfig> {
    let file: ConfigFile =
        toml::from_str(contents).context("failed to parse campaign config toml contents")?;

    let mut config = GameConfig::default();
    if let Some(seed) = file.seed {
        config.seed = seed;
    }
    if !file.levels.is_empty() {
        let levels = file
            .levels
            .into_iter()
            .map(|entry| {
                LevelDefinition::new(
                    LevelId::new(entry.id),
                    entry.max_number,
                    entry.time_limit_secs,
                    entry.base_xp,
                )
            })
            .collect();
        config.campaign = Campaign::new(levels).context("campaign levels are inconsistent")?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_the_built_in_campaign() {
        let config = parse("").expect("empty config is valid");

        assert_eq!(config.campaign, Campaign::default());
        assert_eq!(config.seed, GameConfig::default().seed);
    }

    #[test]
    fn levels_and_seed_are_read() {
        let config = parse(
            r#"
            seed = 7

            [[levels]]
            id = 1
            max_number = 20
            time_limit_secs = 60
            base_xp = 40

            [[levels]]
            id = 2
            max_number = 40
            time_limit_secs = 90
            base_xp = 80
            "#,
        )
        .expect("valid config");

        assert_eq!(config.seed, 7);
        assert_eq!(config.campaign.levels().len(), 2);
        assert_eq!(config.campaign.final_level(), LevelId::new(2));
        assert_eq!(
            config.campaign.level(LevelId::new(1)).map(LevelDefinition::max_number),
            Some(20)
        );
    }

    #[test]
    fn invalid_campaigns_are_reported() {
        let error = parse(
            r#"
            [[levels]]
            id = 2
            max_number = 20
            time_limit_secs = 60
            base_xp = 40
            "#,
        )
        .expect_err("ids must start at one");

        assert!(format!("{error:#}").contains("campaign levels are inconsistent"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse("difficulty = \"hard\"").is_err());
    }

    #[test]
    fn missing_file_is_an_error_with_context() {
        let error = load(Some(Path::new("/nonexistent/crystal-miner.toml")))
            .expect_err("file does not exist");

        assert!(error.to_string().contains("failed to read campaign config"));
    }
}
