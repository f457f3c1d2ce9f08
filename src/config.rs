// SPDX: CC0-1.0

//! Startup configuration, compiled defaults overridden from the environment.
//!
//! - `LIMIT_EXPLORER_OUT_DIR`: directory for the rendered files (default `.`)
//! - `LIMIT_EXPLORER_GNUPLOT`: gnuplot program, `off`, `none` or empty only
//!   writes the files (default `gnuplot`)
//! - `LIMIT_EXPLORER_LOG`: max log level on stderr (default `warn`)

use crate::Number;
use anyhow::Context;
use core::ops::RangeInclusive;
use std::path::PathBuf;
use tracing::Level;

pub const OUT_DIR_VAR: &str = "LIMIT_EXPLORER_OUT_DIR";
pub const GNUPLOT_VAR: &str = "LIMIT_EXPLORER_GNUPLOT";
pub const LOG_VAR: &str = "LIMIT_EXPLORER_LOG";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub function: String,
    pub point: Number,
    pub point_step: Number,
    pub radius: Number,
    pub radius_bounds: RangeInclusive<Number>,
    pub radius_step: Number,
    pub res: [u32; 2],
    pub out_dir: PathBuf,
    pub gnuplot: Option<String>,
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            function: String::from("sin(x)/x"),
            point: 0.0,
            point_step: 0.1,
            radius: 0.5,
            radius_bounds: 0.01..=2.0,
            radius_step: 0.01,
            // 10x6 figure
            res: [1000, 600],
            out_dir: PathBuf::from("."),
            gnuplot: Some(String::from("gnuplot")),
            log_level: Level::WARN,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], reading variables through `var`.
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = var(OUT_DIR_VAR) {
            config.out_dir = PathBuf::from(dir);
        }
        if let Some(program) = var(GNUPLOT_VAR) {
            config.gnuplot = parse_gnuplot(&program);
        }
        if let Some(level) = var(LOG_VAR) {
            config.log_level =
                parse_level(&level).with_context(|| format!("invalid value for {LOG_VAR}"))?;
        }
        Ok(config)
    }

    /// Accepts a radius inside the allowed bounds.
    pub fn check_radius(&self, radius: Number) -> anyhow::Result<Number> {
        anyhow::ensure!(
            self.radius_bounds.contains(&radius),
            "window radius must be between {} and {}",
            self.radius_bounds.start(),
            self.radius_bounds.end()
        );
        Ok(radius)
    }

    pub fn clamp_radius(&self, radius: Number) -> Number {
        radius.clamp(*self.radius_bounds.start(), *self.radius_bounds.end())
    }
}

fn parse_gnuplot(raw: &str) -> Option<String> {
    match raw.trim() {
        "" | "off" | "none" => None,
        program => Some(program.to_string()),
    }
}

fn parse_level(raw: &str) -> anyhow::Result<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        other => anyhow::bail!(
            "unknown log level '{other}' (expected error, warn, info, debug or trace)"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.function, "sin(x)/x");
        assert_eq!(config.radius, 0.5);
        assert_eq!(config.gnuplot.as_deref(), Some("gnuplot"));
        assert_eq!(config.log_level, Level::WARN);
    }

    #[test]
    fn variables_override_defaults() {
        let config = from_pairs(&[
            (OUT_DIR_VAR, "/tmp/plots"),
            (GNUPLOT_VAR, "/usr/local/bin/gnuplot"),
            (LOG_VAR, "DEBUG"),
        ])
        .unwrap();
        assert_eq!(config.out_dir, PathBuf::from("/tmp/plots"));
        assert_eq!(config.gnuplot.as_deref(), Some("/usr/local/bin/gnuplot"));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn viewer_can_be_disabled() {
        for off in ["", "off", "none", "  "] {
            let config = from_pairs(&[(GNUPLOT_VAR, off)]).unwrap();
            assert_eq!(config.gnuplot, None, "{off:?}");
        }
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = from_pairs(&[(LOG_VAR, "loud")]).unwrap_err();
        assert_eq!(err.to_string(), format!("invalid value for {LOG_VAR}"));
        assert!(err.root_cause().to_string().contains("'loud'"));
    }

    #[test]
    fn radius_bounds() {
        let config = Config::default();
        assert_eq!(config.check_radius(0.01).unwrap(), 0.01);
        assert_eq!(config.check_radius(2.0).unwrap(), 2.0);
        assert!(config.check_radius(0.0).is_err());
        assert!(config.check_radius(2.5).is_err());
        assert!(config.check_radius(Number::NAN).is_err());
        assert_eq!(config.clamp_radius(0.001), 0.01);
        assert_eq!(config.clamp_radius(3.0), 2.0);
        assert_eq!(config.clamp_radius(0.7), 0.7);
    }
}
