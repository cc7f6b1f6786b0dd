/// Configuration for the API server
///
/// Loaded from environment variables, with a `.env` file honoured in
/// development.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: `*`)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `MAIL_SMTP_HOST`: SMTP relay; when unset notifications are only logged
/// - `MAIL_SMTP_PORT`: SMTP port (default: 587)
/// - `MAIL_SMTP_USERNAME` / `MAIL_SMTP_PASSWORD`: SMTP credentials
/// - `MAIL_INVITE_FROM`: Sender of agent invitations (default: invite@globalcrm.org)
/// - `MAIL_LEADS_FROM`: Sender of lead notifications (default: leads@globalcrm.org)
///
/// # Example
///
/// ```no_run
/// use leadcrm_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use leadcrm_shared::notify::SmtpSettings;
use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,
}

/// Outgoing mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,

    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,

    /// Sender of agent invitations
    pub invite_from: String,

    /// Sender of lead notifications
    pub leads_from: String,
}

impl MailConfig {
    /// SMTP relay settings, `None` when no relay is configured
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        let host = self.smtp_host.clone()?;
        let credentials = match (&self.smtp_username, &self.smtp_password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        };

        Some(SmtpSettings {
            host,
            port: self.smtp_port,
            credentials,
        })
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            invite_from: "invite@globalcrm.org".to_string(),
            leads_from: "leads@globalcrm.org".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not
    /// parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;

        let cors_origins = var("API_CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = match var("API_PRODUCTION") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| anyhow::anyhow!("API_PRODUCTION must be true or false"))?,
            None => false,
        };

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let defaults = MailConfig::default();
        let mail = MailConfig {
            smtp_host: var("MAIL_SMTP_HOST"),
            smtp_port: match var("MAIL_SMTP_PORT") {
                Some(port) => port
                    .parse::<u16>()
                    .map_err(|e| anyhow::anyhow!("MAIL_SMTP_PORT is invalid: {}", e))?,
                None => defaults.smtp_port,
            },
            smtp_username: var("MAIL_SMTP_USERNAME"),
            smtp_password: var("MAIL_SMTP_PASSWORD"),
            invite_from: var("MAIL_INVITE_FROM").unwrap_or(defaults.invite_from),
            leads_from: var("MAIL_LEADS_FROM").unwrap_or(defaults.leads_from),
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            mail,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether any origin is allowed
    pub fn cors_allows_any(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgresql://localhost/leadcrm"),
            ("JWT_SECRET", SECRET),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = load(&minimal()).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(config.cors_allows_any());
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.mail.smtp_port, 587);
        assert_eq!(config.mail.invite_from, "invite@globalcrm.org");
        assert_eq!(config.mail.leads_from, "leads@globalcrm.org");
        assert!(config.mail.smtp_settings().is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = minimal();
        vars.extend([
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("API_CORS_ORIGINS", "https://a.test, https://b.test"),
            ("API_PRODUCTION", "true"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("MAIL_SMTP_HOST", "smtp.example.com"),
            ("MAIL_SMTP_PORT", "2525"),
            ("MAIL_SMTP_USERNAME", "mailer"),
            ("MAIL_SMTP_PASSWORD", "hunter2"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
        assert!(!config.cors_allows_any());
        assert!(config.api.production);
        assert_eq!(config.database.max_connections, 25);

        let smtp = config.mail.smtp_settings().unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 2525);
        assert_eq!(
            smtp.credentials,
            Some(("mailer".to_string(), "hunter2".to_string()))
        );
    }

    #[test]
    fn test_required_variables() {
        let err = load(&[("JWT_SECRET", SECRET)]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = load(&[("DATABASE_URL", "postgresql://localhost/leadcrm")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let err = load(&[
            ("DATABASE_URL", "postgresql://localhost/leadcrm"),
            ("JWT_SECRET", "too-short"),
        ])
        .unwrap_err();

        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut vars = minimal();
        vars.push(("API_PORT", "http"));
        assert!(load(&vars).is_err());

        let mut vars = minimal();
        vars.push(("API_PRODUCTION", "maybe"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut vars = minimal();
        vars.push(("MAIL_SMTP_PASSWORD", "hunter2"));
        let json = serde_json::to_string(&load(&vars).unwrap()).unwrap();

        assert!(!json.contains(SECRET));
        assert!(!json.contains("hunter2"));
    }
}
