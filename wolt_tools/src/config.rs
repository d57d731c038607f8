use std::time::Duration;

use bolt_common::helpers::parse_millis;
use log::*;

pub const DEFAULT_WOLT_BASE_ADDR: &str = "https://wolt.com";
pub const DEFAULT_WOLT_API_BASE_ADDR: &str = "https://restaurant-api.wolt.com";

#[derive(Debug, Clone)]
pub struct WoltConfig {
    /// The public site, where group invitation pages live.
    pub base_addr: String,
    pub api_base_addr: String,
    pub max_retries: u32,
    pub min_retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for WoltConfig {
    fn default() -> Self {
        Self {
            base_addr: DEFAULT_WOLT_BASE_ADDR.to_string(),
            api_base_addr: DEFAULT_WOLT_API_BASE_ADDR.to_string(),
            max_retries: 5,
            min_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

impl WoltConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let base_addr = std::env::var("BOLT_WOLT_BASE_ADDR").unwrap_or_else(|_| {
            info!("🪛️ BOLT_WOLT_BASE_ADDR not set, using {DEFAULT_WOLT_BASE_ADDR}");
            defaults.base_addr.clone()
        });
        let api_base_addr = std::env::var("BOLT_WOLT_API_BASE_ADDR").unwrap_or_else(|_| {
            info!("🪛️ BOLT_WOLT_API_BASE_ADDR not set, using {DEFAULT_WOLT_API_BASE_ADDR}");
            defaults.api_base_addr.clone()
        });
        let max_retries = std::env::var("BOLT_WOLT_HTTP_MAX_RETRIES")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid BOLT_WOLT_HTTP_MAX_RETRIES value '{s}': {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(defaults.max_retries);
        let min_retry_delay = duration_from_env("BOLT_WOLT_HTTP_MIN_RETRY_MS", defaults.min_retry_delay);
        let max_retry_delay = duration_from_env("BOLT_WOLT_HTTP_MAX_RETRY_MS", defaults.max_retry_delay);
        Self { base_addr, api_base_addr, max_retries, min_retry_delay, max_retry_delay }
    }

    /// Backoff before retry number `attempt` (starting at 1): doubles from the minimum delay and is capped at the
    /// maximum delay.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.min_retry_delay.saturating_mul(factor).min(self.max_retry_delay)
    }
}

fn duration_from_env(var: &str, default: Duration) -> Duration {
    match std::env::var(var) {
        Ok(s) => parse_millis(&s).unwrap_or_else(|e| {
            warn!("🪛️ Invalid {var} value '{s}': {e}. Using {}ms", default.as_millis());
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn retry_delay_backs_off_and_caps() {
        let config = WoltConfig::default();
        assert_eq!(config.retry_delay(1), Duration::from_secs(1));
        assert_eq!(config.retry_delay(2), Duration::from_secs(2));
        assert_eq!(config.retry_delay(5), Duration::from_secs(16));
        assert_eq!(config.retry_delay(6), Duration::from_secs(30));
        assert_eq!(config.retry_delay(40), Duration::from_secs(30));
    }
}
