use std::{env, time::Duration};

use bolt_common::helpers::parse_seconds;
use log::*;

use crate::helpers::{parse_timezone, JoinCutoff};

pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(40 * 60);
pub const DEFAULT_STATUS_CHECK_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(90 * 60);
pub const DEFAULT_GET_READY_THRESHOLD: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_DEBT_REMINDER_INTERVAL: Duration = Duration::from_secs(3 * 60 * 60);
pub const DEFAULT_DEBT_MAXIMUM_DURATION: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_PROFILE_CACHE_MAX_AGE: Duration = Duration::from_secs(6 * 24 * 60 * 60);
pub const DEFAULT_DESTINATION_EMOJI: &str = "house";

/// Timing and behaviour knobs for the order coordinator and the debt reminders.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// How long to wait for the group to be ordered before giving up.
    pub ready_timeout: Duration,
    /// Polling interval for group status, venue status and delivery progress.
    pub status_check_interval: Duration,
    /// How long to follow the delivery once the rates are out.
    pub delivery_timeout: Duration,
    /// Send the "get ready" notice when the delivery is closer than this.
    pub get_ready_threshold: Duration,
    pub debt_reminder_interval: Duration,
    /// Debts still open after this long are dropped.
    pub debt_maximum_duration: Duration,
    /// Links shared at or after this time of day are declined. `None` means always join.
    pub dont_join_after: Option<JoinCutoff>,
    /// The emoji (without colons) drawn at the destination end of the delivery progress art.
    pub destination_emoji: String,
    pub profile_cache_max_age: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ready_timeout: DEFAULT_READY_TIMEOUT,
            status_check_interval: DEFAULT_STATUS_CHECK_INTERVAL,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            get_ready_threshold: DEFAULT_GET_READY_THRESHOLD,
            debt_reminder_interval: DEFAULT_DEBT_REMINDER_INTERVAL,
            debt_maximum_duration: DEFAULT_DEBT_MAXIMUM_DURATION,
            dont_join_after: None,
            destination_emoji: DEFAULT_DESTINATION_EMOJI.to_string(),
            profile_cache_max_age: DEFAULT_PROFILE_CACHE_MAX_AGE,
        }
    }
}

impl CoordinatorConfig {
    pub fn from_env_or_default() -> Self {
        let ready_timeout = seconds_from_env("BOLT_ORDER_READY_TIMEOUT_SECS", DEFAULT_READY_TIMEOUT);
        let status_check_interval = seconds_from_env("BOLT_STATUS_CHECK_INTERVAL_SECS", DEFAULT_STATUS_CHECK_INTERVAL);
        let delivery_timeout = seconds_from_env("BOLT_DELIVERY_TIMEOUT_SECS", DEFAULT_DELIVERY_TIMEOUT);
        let get_ready_threshold = seconds_from_env("BOLT_GET_READY_THRESHOLD_SECS", DEFAULT_GET_READY_THRESHOLD);
        let debt_reminder_interval =
            seconds_from_env("BOLT_DEBT_REMINDER_INTERVAL_SECS", DEFAULT_DEBT_REMINDER_INTERVAL);
        let debt_maximum_duration = seconds_from_env("BOLT_DEBT_MAXIMUM_DURATION_SECS", DEFAULT_DEBT_MAXIMUM_DURATION);
        let profile_cache_max_age =
            seconds_from_env("BOLT_PROFILE_CACHE_MAX_AGE_SECS", DEFAULT_PROFILE_CACHE_MAX_AGE);
        let destination_emoji = env::var("BOLT_DESTINATION_EMOJI")
            .map(|s| s.trim().trim_matches(':').to_string())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_DESTINATION_EMOJI.to_string());
        let dont_join_after = join_cutoff_from_env();
        Self {
            ready_timeout,
            status_check_interval,
            delivery_timeout,
            get_ready_threshold,
            debt_reminder_interval,
            debt_maximum_duration,
            dont_join_after,
            destination_emoji,
            profile_cache_max_age,
        }
    }
}

fn seconds_from_env(var: &str, default: Duration) -> Duration {
    match env::var(var) {
        Ok(s) => parse_seconds(&s).unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {}s, instead.", default.as_secs());
            default
        }),
        Err(_) => {
            info!("🪛️ {var} is not set. Using the default, {}s.", default.as_secs());
            default
        },
    }
}

fn join_cutoff_from_env() -> Option<JoinCutoff> {
    let cutoff = env::var("BOLT_DONT_JOIN_AFTER").ok().filter(|s| !s.trim().is_empty())?;
    let timezone = match env::var("BOLT_DONT_JOIN_AFTER_TZ") {
        Ok(name) => {
            let tz = parse_timezone(&name);
            if tz.is_none() {
                warn!("🪛️ {name} is not a valid timezone for BOLT_DONT_JOIN_AFTER_TZ. Using the server's local time.");
            }
            tz
        },
        Err(_) => None,
    };
    match JoinCutoff::parse(&cutoff, timezone) {
        Ok(c) => {
            info!("🪛️ New group orders will be declined from {cutoff}");
            Some(c)
        },
        Err(e) => {
            warn!("🪛️ {cutoff} is not a valid HH:MM time for BOLT_DONT_JOIN_AFTER. {e} Group orders will always be joined.");
            None
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.ready_timeout, Duration::from_secs(2400));
        assert_eq!(config.delivery_timeout, Duration::from_secs(5400));
        assert_eq!(config.debt_maximum_duration, Duration::from_secs(86400));
        assert_eq!(config.profile_cache_max_age, Duration::from_secs(518400));
        assert!(config.dont_join_after.is_none());
        assert_eq!(config.destination_emoji, "house");
    }

    #[test]
    fn invalid_seconds_fall_back_to_default() {
        env::set_var("BOLT_TEST_ONLY_INTERVAL_SECS", "twenty");
        assert_eq!(seconds_from_env("BOLT_TEST_ONLY_INTERVAL_SECS", Duration::from_secs(20)), Duration::from_secs(20));
        env::set_var("BOLT_TEST_ONLY_INTERVAL_SECS", "45");
        assert_eq!(seconds_from_env("BOLT_TEST_ONLY_INTERVAL_SECS", Duration::from_secs(20)), Duration::from_secs(45));
        env::remove_var("BOLT_TEST_ONLY_INTERVAL_SECS");
    }
}
