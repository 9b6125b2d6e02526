use crate::error::{Error, Result};
use crate::models::threshold_policy::ThresholdPolicy;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub ai_screening_timeout_secs: u64,
    pub integration_rps: u32,
    pub auto_screen_on_application: bool,
    pub default_policy: ThresholdPolicy,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let default_policy = ThresholdPolicy {
            auto_reject_threshold: get_env_or("DEFAULT_AUTO_REJECT_THRESHOLD", 40)?,
            hr_review_threshold: get_env_or("DEFAULT_HR_REVIEW_THRESHOLD", 70)?,
            auto_shortlist_threshold: get_env_or("DEFAULT_AUTO_SHORTLIST_THRESHOLD", 70)?,
            interview_pass_score: get_env_or("DEFAULT_INTERVIEW_PASS_SCORE", Decimal::new(35, 1))?,
        };
        default_policy
            .check()
            .map_err(|e| Error::Config(format!("Invalid default threshold policy: {}", e)))?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            ai_screening_timeout_secs: get_env_or("AI_SCREENING_TIMEOUT_SECS", 30)?,
            integration_rps: get_env_or("INTEGRATION_RPS", 50)?,
            auto_screen_on_application: get_env_or("AUTO_SCREEN_ON_APPLICATION", false)?,
            default_policy,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
