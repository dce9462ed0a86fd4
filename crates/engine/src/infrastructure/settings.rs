//! Pipeline configuration loaded from the environment.

use std::env;

use anyhow::{bail, ensure, Context, Result};
use armory_domain::{AttackMode, RulesTables};

/// How a pipeline pass runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSettings {
    pub rules: RulesTables,
    /// Stop a pass at its first failure instead of isolating it.
    pub strict: bool,
    /// Attack mode used when preparing activity outputs.
    pub attack_mode: AttackMode,
}

impl PipelineSettings {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = RulesTables::default();

        let critical_threshold = match var("ARMORY_CRITICAL_THRESHOLD") {
            Some(raw) => {
                let threshold: u32 = raw
                    .parse()
                    .context("ARMORY_CRITICAL_THRESHOLD must be a whole number")?;
                ensure!(threshold > 0, "ARMORY_CRITICAL_THRESHOLD must be at least 1");
                threshold
            }
            None => defaults.critical_threshold,
        };

        let attack_mode = match var("ARMORY_DEFAULT_ATTACK_MODE") {
            Some(raw) => raw
                .parse::<AttackMode>()
                .with_context(|| format!("ARMORY_DEFAULT_ATTACK_MODE `{raw}` is not an attack mode"))?,
            None => AttackMode::default(),
        };

        let strict = match var("ARMORY_STRICT_PASS") {
            Some(raw) => parse_flag(&raw).context("ARMORY_STRICT_PASS must be true or false")?,
            None => false,
        };

        Ok(Self {
            rules: RulesTables {
                default_melee_ability: var("ARMORY_DEFAULT_MELEE_ABILITY")
                    .unwrap_or(defaults.default_melee_ability),
                default_ranged_ability: var("ARMORY_DEFAULT_RANGED_ABILITY")
                    .unwrap_or(defaults.default_ranged_ability),
                critical_threshold,
                abilities: defaults.abilities,
            },
            strict,
            attack_mode,
        })
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised flag value `{other}`"),
    }
}

/// Load `.env.local` then `.env` from the working directory, if present.
/// Variables already set in the process win.
pub fn load_dotenv() {
    for filename in [".env.local", ".env"] {
        let _ = dotenvy::from_filename(filename);
    }
}
