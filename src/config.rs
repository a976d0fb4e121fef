// src/config.rs

use std::env;
use std::time::Duration;

use anyhow::{anyhow, bail};
use chrono::FixedOffset;

use crate::appointments::lifecycle::BookingPolicy;
use crate::appointments::scope::ConfirmPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub db_max_connections: u32,
    pub run_migrations: bool,

    pub allow_past_bookings: bool,
    pub enforce_working_hours: bool,
    pub confirm_policy: ConfirmPolicy,
    pub clinic_offset: FixedOffset,

    /// Unset disables the calendar mirror.
    pub calendar_webhook_url: Option<String>,
    pub calendar_timeout: Duration,
    pub calendar_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(24);
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(10);

        let confirm_policy = match env::var("CONFIRM_POLICY") {
            Ok(raw) => parse_confirm_policy(&raw)?,
            Err(_) => ConfirmPolicy::default(),
        };
        let clinic_offset = match env::var("CLINIC_UTC_OFFSET") {
            Ok(raw) => parse_utc_offset(&raw)?,
            Err(_) => parse_utc_offset("+02:00")?,
        };

        let calendar_webhook_url = env::var("CALENDAR_WEBHOOK_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let calendar_timeout_secs = env::var("CALENDAR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);
        let calendar_queue_capacity = env::var("CALENDAR_QUEUE_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(256);

        Ok(Self {
            database_url,
            bind_addr,
            session_ttl_hours,
            db_max_connections,
            run_migrations: env_flag("RUN_MIGRATIONS", true),
            allow_past_bookings: env_flag("ALLOW_PAST_BOOKINGS", false),
            enforce_working_hours: env_flag("ENFORCE_WORKING_HOURS", false),
            confirm_policy,
            clinic_offset,
            calendar_webhook_url,
            calendar_timeout: Duration::from_secs(calendar_timeout_secs),
            calendar_queue_capacity,
        })
    }

    pub fn booking_policy(&self) -> BookingPolicy {
        BookingPolicy {
            allow_past_bookings: self.allow_past_bookings,
            enforce_working_hours: self.enforce_working_hours,
            confirm_policy: self.confirm_policy,
            clinic_offset: self.clinic_offset,
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|s| parse_bool(&s))
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_confirm_policy(raw: &str) -> anyhow::Result<ConfirmPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "assigned_doctor" => Ok(ConfirmPolicy::AssignedDoctor),
        "any_doctor" => Ok(ConfirmPolicy::AnyDoctor),
        other => bail!("CONFIRM_POLICY must be assigned_doctor or any_doctor, got {other:?}"),
    }
}

/// "+02:00", "-05:30", "Z".
fn parse_utc_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw == "UTC" {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid offset"));
    }

    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => bail!("CLINIC_UTC_OFFSET must look like +02:00, got {raw:?}"),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| anyhow!("CLINIC_UTC_OFFSET must look like +02:00, got {raw:?}"))?;
    let hours: i32 = hours.parse()?;
    let minutes: i32 = minutes.parse()?;
    if hours > 14 || minutes >= 60 {
        bail!("CLINIC_UTC_OFFSET out of range: {raw:?}");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("CLINIC_UTC_OFFSET out of range: {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets() {
        assert_eq!(parse_utc_offset("+02:00").unwrap().local_minus_utc(), 7200);
        assert_eq!(parse_utc_offset("-05:30").unwrap().local_minus_utc(), -19800);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("2").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
    }

    #[test]
    fn confirm_policy_names() {
        assert_eq!(parse_confirm_policy("any_doctor").unwrap(), ConfirmPolicy::AnyDoctor);
        assert_eq!(parse_confirm_policy(" Assigned_Doctor ").unwrap(), ConfirmPolicy::AssignedDoctor);
        assert!(parse_confirm_policy("everyone").is_err());
    }

    #[test]
    fn bool_flags() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
