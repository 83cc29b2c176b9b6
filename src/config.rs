use std::{env, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow};
use shakmaty::Color;

use crate::{position::Algorithm, util};

pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

const API_BASE_VAR: &str = "ENDGAME_API_BASE";
const TIMEOUT_VAR: &str = "ENDGAME_TIMEOUT_SECS";
const HUMAN_SIDE_VAR: &str = "ENDGAME_HUMAN_SIDE";
const ALGORITHM_VAR: &str = "ENDGAME_ALGORITHM";
const AUTO_RESET_VAR: &str = "ENDGAME_AUTO_RESET";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base: String,
    pub timeout: Duration,
    pub human_side: Color,
    pub algorithm: Option<Algorithm>,
    /// Answer given when the client offers a reset after a finished game.
    pub auto_reset: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            human_side: Color::Black,
            algorithm: None,
            auto_reset: false,
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from the environment. The API base may also be
    /// kept in a file named `ENDGAME_API_BASE` in `dir`.
    pub fn from_env(dir: &Path) -> Result<Self> {
        Self::from_lookup(dir, |key| env::var(key).ok())
    }

    fn from_lookup(dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let api_base = match lookup(API_BASE_VAR) {
            Some(base) => base,
            None => {
                let path = dir.join(API_BASE_VAR);
                if path.is_file() {
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?
                        .trim()
                        .to_string()
                } else {
                    defaults.api_base
                }
            }
        };
        if api_base.is_empty() {
            return Err(anyhow!("{API_BASE_VAR} is empty"));
        }

        let timeout = match lookup(TIMEOUT_VAR) {
            Some(secs) => Duration::from_secs(
                secs.trim()
                    .parse()
                    .with_context(|| format!("{TIMEOUT_VAR}='{secs}' is not a number of seconds"))?,
            ),
            None => defaults.timeout,
        };

        let human_side = match lookup(HUMAN_SIDE_VAR) {
            Some(side) => util::parse_color(&side)
                .ok_or_else(|| anyhow!("{HUMAN_SIDE_VAR}='{side}' is neither white nor black"))?,
            None => defaults.human_side,
        };

        let algorithm = lookup(ALGORITHM_VAR)
            .map(|name| name.parse::<Algorithm>())
            .transpose()?;

        let auto_reset = lookup(AUTO_RESET_VAR)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.auto_reset);

        Ok(Self {
            api_base,
            timeout,
            human_side,
            algorithm,
            auto_reset,
        })
    }
}
