use std::env;
use std::str::FromStr;

use anyhow::Context;
use chrono::Duration;
use puzzle_core::RatingConfig;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expire_hours: i64,
    pub host: String,
    pub port: u16,
    pub rating_tau: f64,
    pub rating_min_deviation: f64,
    pub rating_max_deviation: f64,
    pub rating_period_hours: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = RatingConfig::default();
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET_KEY")
                .unwrap_or_else(|_| "dev-secret-key-change-in-production".to_string()),
            jwt_expire_hours: parse_or("JWT_EXPIRE_HOURS", 168), // 7 days
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 8000),
            rating_tau: parse_or("RATING_TAU", defaults.tau),
            rating_min_deviation: parse_or("RATING_MIN_DEVIATION", defaults.min_deviation),
            rating_max_deviation: parse_or("RATING_MAX_DEVIATION", defaults.max_deviation),
            rating_period_hours: parse_or("RATING_PERIOD_HOURS", defaults.rating_period.num_hours()),
        })
    }

    pub fn rating_config(&self) -> RatingConfig {
        RatingConfig {
            tau: self.rating_tau,
            min_deviation: self.rating_min_deviation,
            max_deviation: self.rating_max_deviation,
            rating_period: Duration::hours(self.rating_period_hours.max(1)),
            ..RatingConfig::default()
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
