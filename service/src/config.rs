use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

/// Default Discord REST API base URL used when `DISCORD_API_BASE_URL` is not set.
pub const DEFAULT_DISCORD_API_BASE_URL: &str = "https://discord.com/api";

/// Default Discord authorization page used when `OAUTH_AUTHORIZE_URL` is not set.
pub const DEFAULT_OAUTH_AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The Discord application (OAuth2 client) ID.
    #[arg(long, env)]
    discord_client_id: Option<String>,

    /// The Discord OAuth2 client secret.
    #[arg(long, env, hide_env_values = true)]
    discord_client_secret: Option<String>,

    /// The bot token used for role mutations and guild lookups.
    #[arg(long, env, hide_env_values = true)]
    discord_bot_token: Option<String>,

    /// The application's hex-encoded Ed25519 public key for verifying interactions.
    #[arg(long, env)]
    discord_public_key: Option<String>,

    /// The pre-registered OAuth2 redirect URI pointing at this server's `/callback`.
    #[arg(long, env)]
    redirect_uri: Option<String>,

    /// The base URL of the Discord REST API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_DISCORD_API_BASE_URL)]
    discord_api_base_url: String,

    /// The identity provider's authorization page.
    #[arg(long, env, default_value = DEFAULT_OAUTH_AUTHORIZE_URL)]
    oauth_authorize_url: String,

    /// Space separated OAuth2 scopes requested during verification.
    #[arg(long, env, default_value = "identify guilds.join")]
    oauth_scopes: String,

    /// Name of the role held by members who have not verified yet.
    #[arg(long, env, default_value = "Unverified")]
    pub restricted_role_name: String,

    /// Name of the role granted on successful verification.
    #[arg(long, env, default_value = "Verified")]
    pub full_access_role_name: String,

    /// Extra role IDs granted on successful verification, best-effort.
    #[arg(long, env, value_delimiter = ',', use_value_delimiter = true)]
    pub supplementary_role_ids: Vec<String>,

    /// Seconds a pending verification stays redeemable.
    #[arg(long, env, default_value_t = 600)]
    pub pending_ttl_secs: u64,

    /// Seconds between sweeps of expired pending verifications.
    #[arg(long, env, default_value_t = 60)]
    pub pending_sweep_interval_secs: u64,

    /// Timeout in seconds for outbound platform API requests.
    #[arg(long, env, default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Maximum retries for transient platform API failures.
    #[arg(long, env, default_value_t = 3)]
    pub http_max_retries: u32,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 3000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Build a config from explicit arguments, ignoring the process command line.
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Config::try_parse_from(args)
    }

    /// Returns the Discord OAuth2 client ID, if configured.
    pub fn discord_client_id(&self) -> Option<String> {
        self.discord_client_id.clone()
    }

    /// Returns the Discord OAuth2 client secret, if configured.
    pub fn discord_client_secret(&self) -> Option<String> {
        self.discord_client_secret.clone()
    }

    /// Returns the Discord bot token, if configured.
    pub fn discord_bot_token(&self) -> Option<String> {
        self.discord_bot_token.clone()
    }

    /// Returns the interaction signing public key, if configured.
    pub fn discord_public_key(&self) -> Option<String> {
        self.discord_public_key.clone()
    }

    /// Returns the OAuth2 redirect URI, if configured.
    pub fn redirect_uri(&self) -> Option<String> {
        self.redirect_uri.clone()
    }

    /// Returns the Discord REST API base URL without a trailing slash.
    pub fn discord_api_base_url(&self) -> &str {
        self.discord_api_base_url.trim_end_matches('/')
    }

    pub fn oauth_authorize_url(&self) -> &str {
        &self.oauth_authorize_url
    }

    pub fn oauth_scopes(&self) -> &str {
        &self.oauth_scopes
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_args(["verifyme"]).unwrap();

        assert_eq!(config.restricted_role_name, "Unverified");
        assert_eq!(config.full_access_role_name, "Verified");
        assert_eq!(config.oauth_scopes(), "identify guilds.join");
        assert_eq!(config.pending_ttl_secs, 600);
        assert_eq!(config.port, 3000);
        assert!(config.supplementary_role_ids.is_empty());
        assert!(!config.is_production());
    }

    #[test]
    fn test_supplementary_roles_are_comma_separated() {
        let config =
            Config::from_args(["verifyme", "--supplementary-role-ids", "111,222"]).unwrap();

        assert_eq!(config.supplementary_role_ids, vec!["111", "222"]);
    }

    #[test]
    fn test_api_base_url_trailing_slash_trimmed() {
        let config = Config::from_args([
            "verifyme",
            "--discord-api-base-url",
            "http://127.0.0.1:1234/",
        ])
        .unwrap();

        assert_eq!(config.discord_api_base_url(), "http://127.0.0.1:1234");
    }

    #[test]
    fn test_runtime_env_parsing() {
        assert_eq!("PRODUCTION".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("nope".parse::<RustEnv>(), Err(RustEnvParseError));
    }
}
