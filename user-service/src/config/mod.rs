use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub run_migrations: bool,
}

/// Identity provider admin API.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub url: String,
    /// Without it user creation and deletion answer with a configuration
    /// error; the rest of the service still runs.
    pub service_role_key: Option<Secret<String>>,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub admin_api_key: Secret<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwaggerMode {
    Public,
    Disabled,
}

impl UserServiceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = UserServiceConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("user-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: Secret::new(get_env("DATABASE_URL", None, is_prod)?),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
                run_migrations: parse_env("RUN_MIGRATIONS", "true", is_prod)?,
            },
            identity: IdentityConfig {
                url: get_env("IDENTITY_PROVIDER_URL", None, is_prod)?
                    .trim_end_matches('/')
                    .to_string(),
                service_role_key: env::var("IDENTITY_SERVICE_ROLE_KEY")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(Secret::new),
                page_size: parse_env("IDENTITY_PAGE_SIZE", "200", false)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
                admin_api_key: Secret::new(get_env("ADMIN_API_KEY", None, true)?),
            },
            swagger: get_env("ENABLE_SWAGGER", Some("public"), is_prod)?
                .parse()
                .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.identity.page_size == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "IDENTITY_PAGE_SIZE must be positive"
            )));
        }

        if self.security.admin_api_key.expose_secret().trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ADMIN_API_KEY must not be blank"
            )));
        }

        if self.security.allowed_origins.iter().any(|o| o == "*")
            && self.security.allowed_origins.len() > 1
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ALLOWED_ORIGINS cannot mix '*' with explicit origins"
            )));
        }

        if self.identity.service_role_key.is_none() {
            tracing::warn!(
                "IDENTITY_SERVICE_ROLE_KEY is not set; user creation and deletion will fail"
            );
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.swagger == SwaggerMode::Public {
                tracing::warn!("Swagger is publicly accessible in production");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod && default.is_none() {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(SwaggerMode::Public),
            "disabled" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> UserServiceConfig {
        UserServiceConfig {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "user-service".to_string(),
            service_version: "test".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: Secret::new("postgres://localhost/usuarios_test".to_string()),
                max_connections: 5,
                min_connections: 1,
                run_migrations: false,
            },
            identity: IdentityConfig {
                url: "http://localhost:54321".to_string(),
                service_role_key: None,
                page_size: 200,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
                admin_api_key: Secret::new("admin-key".to_string()),
            },
            swagger: SwaggerMode::Public,
        }
    }

    #[test]
    fn parses_environment_and_swagger_mode() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!(
            "disabled".parse::<SwaggerMode>().unwrap(),
            SwaggerMode::Disabled
        );
        assert!("authenticated".parse::<SwaggerMode>().is_err());
    }

    #[test]
    fn rejects_wildcard_origin_in_production() {
        let mut config = test_config();
        config.environment = Environment::Prod;
        config.security.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_pool_bounds() {
        let mut config = test_config();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_blank_admin_api_key() {
        let mut config = test_config();
        config.security.admin_api_key = Secret::new("   ".to_string());
        assert!(config.validate().is_err());

        config.security.admin_api_key = Secret::new(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn wildcard_origin_is_allowed_outside_production() {
        let mut config = test_config();
        config.security.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_ok());

        config.security.allowed_origins.push("http://localhost:3000".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_role_key_is_not_fatal() {
        assert!(test_config().validate().is_ok());
    }
}
