use std::str::FromStr;

use crate::quiz::session::DEFAULT_QUESTIONS;

const DEFAULT_FFPROBE: &str = "ffprobe";
// Bot API refuses to hand out files bigger than this
const DEFAULT_MAX_FILE_SIZE_MB: u32 = 20;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ffprobe_path: String,
    pub questions_per_quiz: usize,
    pub max_file_size_mb: u32,
}

impl Config {
    /// Reads the configuration from the process environment.
    /// `TELOXIDE_TOKEN` is read separately by `Bot::from_env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ffprobe_path = lookup("FFPROBE_PATH")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_FFPROBE.to_string());

        let questions_per_quiz = parse_var(&lookup, "QUIZ_QUESTIONS", DEFAULT_QUESTIONS)?;
        if questions_per_quiz == 0 {
            return Err(ConfigError::Invalid {
                name: "QUIZ_QUESTIONS",
                value: "0".to_string(),
            });
        }

        let max_file_size_mb = parse_var(&lookup, "MAX_FILE_SIZE_MB", DEFAULT_MAX_FILE_SIZE_MB)?;

        Ok(Self {
            ffprobe_path,
            questions_per_quiz,
            max_file_size_mb,
        })
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        u64::from(self.max_file_size_mb) * 1024 * 1024
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
    }
}
