use std::{env, time::Duration};

use bolt_common::{
    helpers::{parse_boolean_flag, parse_list, parse_millis},
    Secret,
};
use log::*;

const DEFAULT_BOLT_HOST: &str = "127.0.0.1";
const DEFAULT_BOLT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/bolt_store.db";
const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
const DEFAULT_INGRESS_WORKERS: usize = 100;
const DEFAULT_INGRESS_QUEUE_SIZE: usize = 100;
const DEFAULT_INGRESS_ACCEPT_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Slack member ids that may use the admin slash commands.
    pub admin_user_ids: Vec<String>,
    /// If true, inbound Slack requests are accepted without checking their signature. **DANGER**
    pub disable_signature_verification: bool,
    pub ingress: IngressConfig,
    pub slack: SlackConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BOLT_HOST.to_string(),
            port: DEFAULT_BOLT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            admin_user_ids: Vec::new(),
            disable_signature_verification: false,
            ingress: IngressConfig::default(),
            slack: SlackConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BOLT_HOST").ok().unwrap_or_else(|| DEFAULT_BOLT_HOST.into());
        let port = env::var("BOLT_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BOLT_PORT. {e} Using the default, {DEFAULT_BOLT_PORT}, \
                         instead."
                    );
                    DEFAULT_BOLT_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BOLT_PORT);
        let database_url = env::var("BOLT_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ BOLT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let admin_user_ids = env::var("BOLT_ADMIN_USER_IDS").map(|s| parse_list(&s)).unwrap_or_default();
        if admin_user_ids.is_empty() {
            warn!("🪛️ BOLT_ADMIN_USER_IDS is empty. Nobody will be able to use the admin commands.");
        }
        let disable_signature_verification =
            parse_boolean_flag(env::var("BOLT_DISABLE_SIGNATURE_VERIFICATION").ok(), false);
        if disable_signature_verification {
            warn!(
                "🚨️🚨️🚨️ Slack signature verification is disabled. Anyone can post events to this server. Do not run \
                 in production like this. 🚨️🚨️🚨️"
            );
        }
        let ingress = IngressConfig::from_env_or_default();
        let slack = SlackConfig::from_env_or_default();
        Self { host, port, database_url, admin_user_ids, disable_signature_verification, ingress, slack }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration that request handlers need. Secrets stay out of it.
#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    pub admin_user_ids: Vec<String>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { admin_user_ids: config.admin_user_ids.clone() }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user_ids.iter().any(|id| id == user_id)
    }
}

//-------------------------------------------------  IngressConfig  ----------------------------------------------------
/// Sizing of the queues that inbound Slack events are handed to.
#[derive(Clone, Copy, Debug)]
pub struct IngressConfig {
    pub workers: usize,
    pub queue_size: usize,
    /// How long a request waits for room in a full queue before it is answered with 429.
    pub accept_timeout: Duration,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_INGRESS_WORKERS,
            queue_size: DEFAULT_INGRESS_QUEUE_SIZE,
            accept_timeout: DEFAULT_INGRESS_ACCEPT_TIMEOUT,
        }
    }
}

impl IngressConfig {
    pub fn from_env_or_default() -> Self {
        let workers = count_from_env("BOLT_INGRESS_WORKERS", DEFAULT_INGRESS_WORKERS);
        let queue_size = count_from_env("BOLT_INGRESS_QUEUE_SIZE", DEFAULT_INGRESS_QUEUE_SIZE);
        let accept_timeout = env::var("BOLT_INGRESS_ACCEPT_TIMEOUT_MS")
            .map_err(|_| {
                info!(
                    "🪛️ BOLT_INGRESS_ACCEPT_TIMEOUT_MS is not set. Using the default value of {} ms.",
                    DEFAULT_INGRESS_ACCEPT_TIMEOUT.as_millis()
                )
            })
            .and_then(|s| {
                parse_millis(&s).map_err(|e| warn!("🪛️ Invalid configuration value for BOLT_INGRESS_ACCEPT_TIMEOUT_MS. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_INGRESS_ACCEPT_TIMEOUT);
        Self { workers, queue_size, accept_timeout }
    }
}

fn count_from_env(var: &str, default: usize) -> usize {
    match env::var(var) {
        Ok(s) => match s.trim().parse::<usize>() {
            Ok(0) => {
                warn!("🪛️ {var} must be greater than zero. Using the default, {default}, instead.");
                default
            },
            Ok(n) => n,
            Err(e) => {
                warn!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
                default
            },
        },
        Err(_) => {
            info!("🪛️ {var} is not set. Using the default, {default}.");
            default
        },
    }
}

//-------------------------------------------------  SlackConfig  ------------------------------------------------------
#[derive(Clone, Debug)]
pub struct SlackConfig {
    /// The bot token used for Web API calls.
    pub oauth_token: Secret<String>,
    /// Used to check the signature on inbound requests.
    pub signing_secret: Secret<String>,
    pub api_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            oauth_token: Secret::default(),
            signing_secret: Secret::default(),
            api_url: DEFAULT_SLACK_API_URL.to_string(),
        }
    }
}

impl SlackConfig {
    pub fn from_env_or_default() -> Self {
        let oauth_token = env::var("BOLT_SLACK_OAUTH_TOKEN").ok().unwrap_or_else(|| {
            error!("🪛️ BOLT_SLACK_OAUTH_TOKEN is not set. Please set it to the bot token of your Slack app.");
            String::default()
        });
        let signing_secret = env::var("BOLT_SLACK_SIGNING_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ BOLT_SLACK_SIGNING_SECRET is not set. Please set it to the signing secret of your Slack app.");
            String::default()
        });
        let api_url = env::var("BOLT_SLACK_API_URL").ok().unwrap_or_else(|| {
            info!("🪛️ BOLT_SLACK_API_URL is not set. Using the default, {DEFAULT_SLACK_API_URL}.");
            DEFAULT_SLACK_API_URL.to_string()
        });
        Self { oauth_token: Secret::new(oauth_token), signing_secret: Secret::new(signing_secret), api_url }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite://data/bolt_store.db");
        assert_eq!(config.ingress.workers, 100);
        assert_eq!(config.ingress.queue_size, 100);
        assert_eq!(config.ingress.accept_timeout, Duration::from_secs(1));
        assert_eq!(config.slack.api_url, "https://slack.com/api");
        assert!(!config.disable_signature_verification);
    }

    #[test]
    fn admins() {
        let config = ServerConfig { admin_user_ids: vec!["U01".into(), "U02".into()], ..Default::default() };
        let options = ServerOptions::from_config(&config);
        assert!(options.is_admin("U02"));
        assert!(!options.is_admin("U03"));
        assert!(!ServerOptions::default().is_admin(""));
    }

    #[test]
    fn worker_counts_must_be_positive() {
        env::set_var("BOLT_TEST_ONLY_WORKERS", "0");
        assert_eq!(count_from_env("BOLT_TEST_ONLY_WORKERS", 7), 7);
        env::set_var("BOLT_TEST_ONLY_WORKERS", "many");
        assert_eq!(count_from_env("BOLT_TEST_ONLY_WORKERS", 7), 7);
        env::set_var("BOLT_TEST_ONLY_WORKERS", "12");
        assert_eq!(count_from_env("BOLT_TEST_ONLY_WORKERS", 7), 12);
        env::remove_var("BOLT_TEST_ONLY_WORKERS");
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let slack = SlackConfig { oauth_token: Secret::new("xoxb-secret".into()), ..Default::default() };
        assert!(!format!("{slack:?}").contains("xoxb-secret"));
    }
}
