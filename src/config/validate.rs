// src/config/validate.rs

use std::time::Duration;

use globset::Glob;

use crate::config::model::{
    default_socket_path, default_state_file, ConfigFile, DaemonConfig, RawConfigFile,
};
use crate::errors::{Result, SyncError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SyncError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let d = raw.daemon;
        let daemon = DaemonConfig {
            socket: d.socket.unwrap_or_else(default_socket_path),
            state_file: d.state_file.unwrap_or_else(default_state_file),
            parallel: d.parallel,
            delay: parse_duration(&d.delay).map_err(SyncError::ConfigError)?,
            quiet: parse_duration(&d.quiet).map_err(SyncError::ConfigError)?,
            guess_text: d.guess_text,
            text_probe_bytes: d.text_probe_bytes,
            rsync: d.rsync,
            ssh: d.ssh,
        };
        Ok(ConfigFile::new_unchecked(daemon, raw.ignore))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_daemon_section(cfg)?;
    validate_ignore_section(cfg)?;
    Ok(())
}

fn validate_daemon_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.daemon.parallel == 0 {
        return Err(SyncError::ConfigError(
            "[daemon].parallel must be >= 1 (got 0)".to_string(),
        ));
    }

    for (key, value) in [("delay", &cfg.daemon.delay), ("quiet", &cfg.daemon.quiet)] {
        let d = parse_duration(value)
            .map_err(|e| SyncError::ConfigError(format!("[daemon].{key}: {e}")))?;
        if d.is_zero() {
            return Err(SyncError::ConfigError(format!(
                "[daemon].{key} must be greater than zero"
            )));
        }
    }

    for (key, value) in [("rsync", &cfg.daemon.rsync), ("ssh", &cfg.daemon.ssh)] {
        if value.trim().is_empty() {
            return Err(SyncError::ConfigError(format!(
                "[daemon].{key} must name a program"
            )));
        }
    }

    if cfg.daemon.guess_text && cfg.daemon.text_probe_bytes == 0 {
        return Err(SyncError::ConfigError(
            "[daemon].text_probe_bytes must be >= 1 when guess_text is enabled".to_string(),
        ));
    }

    Ok(())
}

fn validate_ignore_section(cfg: &RawConfigFile) -> Result<()> {
    for ext in cfg.ignore.extensions.iter() {
        if ext.trim_start_matches('.').is_empty() {
            return Err(SyncError::ConfigError(
                "[ignore].extensions must not contain empty entries".to_string(),
            ));
        }
    }

    for pattern in cfg.ignore.patterns.iter() {
        Glob::new(pattern).map_err(|e| {
            SyncError::ConfigError(format!("[ignore].patterns: invalid glob '{pattern}': {e}"))
        })?;
    }

    Ok(())
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ))
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
