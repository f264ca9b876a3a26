//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::articles::{DEFAULT_FILENAME_PATTERN, FilenamePattern};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "taccuino";
const ENV_PREFIX: &str = "TACCUINO";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ARTICLES_DIR: &str = "articles";
const DEFAULT_ABOUT_FILE: &str = "aboutme.md";
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_DATE_SEPARATOR: &str = "-";
const DEFAULT_SECRET_FILE: &str = "secret.txt";
pub const DEFAULT_WEBHOOK_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;
pub(crate) const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";
pub(crate) const DEFAULT_CACHE_HASH_KEY: &str = "taccuino:articles";
pub(crate) const DEFAULT_CACHE_CONNECT_TIMEOUT_MS: u64 = 1000;
const DEFAULT_REPO_DIR: &str = ".";
const DEFAULT_GIT_BINARY: &str = "git";
const DEFAULT_SITE_TITLE: &str = "Taccuino";
const DEFAULT_SITE_SUBTITLE: &str = "Notes, mostly about software";

/// Command-line arguments for the taccuino binary.
#[derive(Debug, Parser)]
#[command(name = "taccuino", version, about = "Personal blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TACCUINO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Write the article catalog as a Markdown index.
    Catalog(CatalogArgs),
    /// Print the webhook signature header for a payload.
    Sign(SignArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverride {
    /// Override the article directory.
    #[arg(long = "articles-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub articles_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SecretOverride {
    /// Override the webhook secret file.
    #[arg(long = "secret-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub secret_file: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content: ContentOverride,

    #[command(flatten)]
    pub secret: SecretOverride,

    /// Toggle debug mode (no render cache, verbose logs).
    #[arg(long = "debug", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub debug: Option<bool>,

    /// Override the listener host.
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Override the listener port.
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Toggle the external (Redis) article cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the Redis connection URL.
    #[arg(long = "redis-url", value_name = "URL")]
    pub redis_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct CatalogArgs {
    #[command(flatten)]
    pub content: ContentOverride,

    /// File to write; standard output when omitted.
    #[arg(long, short, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SignArgs {
    #[command(flatten)]
    pub secret: SecretOverride,

    /// Payload to sign, read as raw bytes.
    #[arg(long = "body-file", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub body_file: PathBuf,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub webhook: WebhookSettings,
    pub cache: CacheSettings,
    pub sync: SyncSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub articles_dir: PathBuf,
    /// Name of the about page source, inside `articles_dir`.
    pub about_file: String,
    pub static_dir: PathBuf,
    pub filename_pattern: FilenamePattern,
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub secret_file: PathBuf,
    /// Largest push payload accepted on the webhook routes.
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub redis_url: String,
    pub hash_key: String,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub enabled: bool,
    pub repo_dir: PathBuf,
    pub git_binary: String,
}

/// Page chrome shown on every rendered page.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub subtitle: String,
    pub announcement: String,
    pub github_url: Option<String>,
    pub author: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Catalog(args)) => raw.apply_content_override(&args.content),
        Some(Command::Sign(args)) => raw.apply_secret_override(&args.secret),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    webhook: RawWebhookSettings,
    cache: RawCacheSettings,
    sync: RawSyncSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(debug) = overrides.debug {
            self.server.debug = Some(debug);
        }
        if let Some(host) = overrides.host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        self.apply_content_override(&overrides.content);
        self.apply_secret_override(&overrides.secret);
    }

    fn apply_content_override(&mut self, overrides: &ContentOverride) {
        if let Some(dir) = overrides.articles_dir.as_ref() {
            self.content.articles_dir = Some(dir.clone());
        }
    }

    fn apply_secret_override(&mut self, overrides: &SecretOverride) {
        if let Some(path) = overrides.secret_file.as_ref() {
            self.webhook.secret_file = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            webhook,
            cache,
            sync,
            site,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging, server.debug)?;
        let content = build_content_settings(content)?;
        let webhook = build_webhook_settings(webhook)?;
        let cache = build_cache_settings(cache)?;
        let sync = build_sync_settings(sync)?;
        let site = build_site_settings(site);

        Ok(Self {
            server,
            logging,
            content,
            webhook,
            cache,
            sync,
            site,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.host", reason))?;

    Ok(ServerSettings {
        addr,
        debug: server.debug.unwrap_or(false),
    })
}

fn build_logging_settings(
    logging: RawLoggingSettings,
    debug: bool,
) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None if debug => LevelFilter::DEBUG,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let articles_dir = non_empty_path(
        content.articles_dir,
        DEFAULT_ARTICLES_DIR,
        "content.articles_dir",
    )?;
    let static_dir = non_empty_path(content.static_dir, DEFAULT_STATIC_DIR, "content.static_dir")?;

    let about_file = content
        .about_file
        .unwrap_or_else(|| DEFAULT_ABOUT_FILE.to_string());
    if about_file.trim().is_empty() {
        return Err(LoadError::invalid(
            "content.about_file",
            "file name must not be empty",
        ));
    }

    let pattern = content
        .filename_pattern
        .unwrap_or_else(|| DEFAULT_FILENAME_PATTERN.to_string());
    let separator = content
        .date_separator
        .unwrap_or_else(|| DEFAULT_DATE_SEPARATOR.to_string());
    let filename_pattern = FilenamePattern::new(&pattern, separator)
        .map_err(|err| LoadError::invalid("content.filename_pattern", err.to_string()))?;

    Ok(ContentSettings {
        articles_dir,
        about_file,
        static_dir,
        filename_pattern,
    })
}

fn build_webhook_settings(webhook: RawWebhookSettings) -> Result<WebhookSettings, LoadError> {
    let max_body_bytes = webhook
        .max_body_bytes
        .unwrap_or(DEFAULT_WEBHOOK_MAX_BODY_BYTES);
    if max_body_bytes == 0 {
        return Err(LoadError::invalid(
            "webhook.max_body_bytes",
            "must be greater than zero",
        ));
    }

    Ok(WebhookSettings {
        secret_file: non_empty_path(
            webhook.secret_file,
            DEFAULT_SECRET_FILE,
            "webhook.secret_file",
        )?,
        max_body_bytes,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let redis_url = cache
        .redis_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

    let hash_key = cache
        .hash_key
        .unwrap_or_else(|| DEFAULT_CACHE_HASH_KEY.to_string());
    if hash_key.is_empty() {
        return Err(LoadError::invalid("cache.hash_key", "must not be empty"));
    }

    let timeout_ms = cache
        .connect_timeout_ms
        .unwrap_or(DEFAULT_CACHE_CONNECT_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.connect_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        redis_url,
        hash_key,
        connect_timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_sync_settings(sync: RawSyncSettings) -> Result<SyncSettings, LoadError> {
    let git_binary = sync
        .git_binary
        .unwrap_or_else(|| DEFAULT_GIT_BINARY.to_string());
    if git_binary.trim().is_empty() {
        return Err(LoadError::invalid("sync.git_binary", "must not be empty"));
    }

    Ok(SyncSettings {
        enabled: sync.enabled.unwrap_or(true),
        repo_dir: non_empty_path(sync.repo_dir, DEFAULT_REPO_DIR, "sync.repo_dir")?,
        git_binary,
    })
}

fn build_site_settings(site: RawSiteSettings) -> SiteSettings {
    SiteSettings {
        title: site.title.unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
        subtitle: site
            .subtitle
            .unwrap_or_else(|| DEFAULT_SITE_SUBTITLE.to_string()),
        announcement: site.announcement.unwrap_or_default(),
        github_url: site.github_url.filter(|url| !url.trim().is_empty()),
        author: site.author.unwrap_or_default(),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    debug: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    articles_dir: Option<PathBuf>,
    about_file: Option<String>,
    static_dir: Option<PathBuf>,
    filename_pattern: Option<String>,
    date_separator: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWebhookSettings {
    secret_file: Option<PathBuf>,
    max_body_bytes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    redis_url: Option<String>,
    hash_key: Option<String>,
    connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSyncSettings {
    enabled: Option<bool>,
    repo_dir: Option<PathBuf>,
    git_binary: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    subtitle: Option<String>,
    announcement: Option<String>,
    github_url: Option<String>,
    author: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
