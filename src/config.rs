use clap::Parser;
use config::{ConfigBuilder, ConfigError, builder::DefaultState};
use serde::Deserialize;

const ENV_PREFIX: &str = "CAMPUS";
const DEFAULT_FILE: &str = "setup";
const PASETO_KEY_LEN: usize = 32;
pub const DEVELOPMENT_PASETO_KEY: &str = "CAMPUS QA LOCAL DEVELOPMENT KEY!";

/// 명령줄 인자. 주어진 값은 설정 파일과 환경 변수보다 우선한다.
#[derive(Parser, Debug, Default, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// 설정 파일 경로 (확장자 생략 가능)
    #[clap(short, long)]
    pub config: Option<String>,
    #[clap(long)]
    pub log_level: Option<String>,
    #[clap(short, long)]
    pub port: Option<u16>,
    #[clap(long)]
    pub database_url: Option<String>,
    #[clap(long, arg_enum)]
    pub backend: Option<Backend>,
}

#[derive(clap::ArgEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    Memory,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: String,
    pub port: u16,
    pub backend: Backend,
    pub database_url: String,
    pub db_max_connections: u32,
    pub paseto_key: String,
    pub institution_domain: String,
    pub completion_url: String,
    pub completion_model: String,
    pub completion_api_key: Option<String>,
    pub completion_timeout_secs: u64,
    pub context_window_days: i64,
    pub context_max_chars: usize,
    pub chat_session_ttl_secs: i64,
    pub chat_history_limit: usize,
}

impl Config {
    /// `.env` → 기본값 → setup.toml → `CAMPUS_*` 환경 변수 → 명령줄 순서로 덮어쓴다.
    pub fn new() -> Result<Config, ConfigError> {
        dotenv::dotenv().ok();
        let args = Args::parse();
        Config::load(&args)
    }

    pub fn load(args: &Args) -> Result<Config, ConfigError> {
        let file = args.config.as_deref().unwrap_or(DEFAULT_FILE);
        let config = defaults(config::Config::builder())?
            .add_source(config::File::with_name(file).required(args.config.is_some()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize::<Config>()?;

        config.with_overrides(args).validated()
    }

    fn with_overrides(mut self, args: &Args) -> Self {
        if let Some(log_level) = &args.log_level {
            self.log_level = log_level.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(database_url) = &args.database_url {
            self.database_url = database_url.clone();
        }
        if let Some(backend) = args.backend {
            self.backend = backend;
        }
        self
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.paseto_key.len() != PASETO_KEY_LEN {
            return Err(ConfigError::Message(format!(
                "paseto_key must be exactly {} bytes, got {}",
                PASETO_KEY_LEN,
                self.paseto_key.len()
            )));
        }
        if self.chat_history_limit == 0 {
            return Err(ConfigError::Message(
                "chat_history_limit must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn uses_development_key(&self) -> bool {
        self.paseto_key == DEVELOPMENT_PASETO_KEY
    }
}

fn defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("log_level", "warn")?
        .set_default("port", 3030_i64)?
        .set_default("backend", "postgres")?
        .set_default("database_url", "postgres://localhost:5432/campus_qa")?
        .set_default("db_max_connections", 5_i64)?
        .set_default("paseto_key", DEVELOPMENT_PASETO_KEY)?
        .set_default("institution_domain", "university.edu")?
        .set_default(
            "completion_url",
            "https://generativelanguage.googleapis.com/v1beta",
        )?
        .set_default("completion_model", "gemini-2.0-flash")?
        .set_default("completion_timeout_secs", 30_i64)?
        .set_default("context_window_days", 30_i64)?
        .set_default("context_max_chars", 12_000_i64)?
        .set_default("chat_session_ttl_secs", 900_i64)?
        .set_default("chat_history_limit", 20_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Config, ConfigError> {
        defaults(config::Config::builder())?
            .add_source(config::File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<Config>()
    }

    #[test]
    fn defaults_are_complete() {
        let config = from_toml("").unwrap();
        assert_eq!(config.port, 3030);
        assert_eq!(config.backend, Backend::Postgres);
        assert_eq!(config.institution_domain, "university.edu");
        assert_eq!(config.completion_timeout_secs, 30);
        assert_eq!(config.chat_history_limit, 20);
        assert_eq!(config.chat_session_ttl_secs, 900);
        assert_eq!(config.completion_api_key, None);
        assert!(config.uses_development_key());
        assert_eq!(DEVELOPMENT_PASETO_KEY.len(), PASETO_KEY_LEN);
    }

    #[test]
    fn file_values_and_flags_override_defaults() {
        let config = from_toml(
            "port = 8080\nbackend = \"memory\"\ninstitution_domain = \"campus.ac.kr\"",
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.institution_domain, "campus.ac.kr");

        let args = Args {
            port: Some(9090),
            log_level: Some("debug".to_string()),
            backend: Some(Backend::Postgres),
            ..Args::default()
        };
        let config = config.with_overrides(&args);
        assert_eq!(config.port, 9090);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.backend, Backend::Postgres);
        assert_eq!(config.institution_domain, "campus.ac.kr");
    }

    #[test]
    fn short_paseto_key_is_rejected() {
        let config = from_toml("paseto_key = \"too short\"").unwrap();
        assert!(config.validated().is_err());
    }

    #[test]
    fn command_line_flags_parse() {
        let args = Args::parse_from([
            "campus_qa",
            "--backend",
            "memory",
            "--port",
            "4000",
            "--database-url",
            "postgres://db/campus",
        ]);
        assert_eq!(args.backend, Some(Backend::Memory));
        assert_eq!(args.port, Some(4000));
        assert_eq!(args.database_url.as_deref(), Some("postgres://db/campus"));
    }
}
