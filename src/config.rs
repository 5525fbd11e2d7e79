use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,

    // Sessions
    pub session_secret: Secret<String>,
    pub secure_cookies: bool,

    // Mixed into password hashes when set
    pub password_pepper: Option<Secret<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            database_max_connections: config.get("database_max_connections").unwrap_or(20),
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            session_secret: Secret::new(config.get("session_secret")?),
            secure_cookies: config.get("secure_cookies").unwrap_or(true),

            password_pepper: config
                .get::<String>("password_pepper")
                .ok()
                .filter(|p| !p.is_empty())
                .map(Secret::new),
        })
    }
}
