//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret shared with the authentication provider.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            tasks:
                Tasks {
                    deliver_notifications,
                    mark_overdue_rent_payments,
                },
        } = value;
        Self {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            deliver_notifications:
                service::task::deliver_notifications::Config {
                    interval: deliver_notifications.interval,
                    batch_size: deliver_notifications.batch_size,
                },
            mark_overdue_rent_payments:
                service::task::mark_overdue_rent_payments::Config {
                    interval: mark_overdue_rent_payments.interval,
                },
        }
    }
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `DeliverNotifications` task configuration.
    pub deliver_notifications: DeliverNotifications,

    /// `MarkOverdueRentPayments` task configuration.
    pub mark_overdue_rent_payments: MarkOverdueRentPayments,
}

/// `DeliverNotifications` task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct DeliverNotifications {
    /// Task execution interval.
    #[default(time::Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,

    /// Maximum number of notifications delivered per execution.
    #[default(100)]
    pub batch_size: u16,
}

/// `MarkOverdueRentPayments` task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct MarkOverdueRentPayments {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,

    /// Maximum number of pooled connections.
    ///
    /// Every open transaction holds one of them until it ends.
    #[default(16)]
    pub max_connections: usize,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
            max_connections,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            pool: Some(service::infra::postgres::PoolConfig::new(
                max_connections,
            )),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time;

    use super::Config;

    #[test]
    fn falls_back_to_defaults_without_file() {
        let conf = Config::new("definitely-missing.toml").unwrap();

        assert_eq!(conf.server.port, 8080);
        assert_eq!(conf.postgres.max_connections, 16);
        assert_eq!(conf.service.tasks.deliver_notifications.batch_size, 100);
        assert_eq!(
            conf.service.tasks.mark_overdue_rent_payments.interval,
            time::Duration::from_secs(3600),
        );
    }

    #[test]
    fn fills_missing_sections_with_defaults() {
        let conf = config::Config::builder()
            .add_source(config::File::from_str(
                "[server]\nport = 9090\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize::<Config>()
            .unwrap();

        assert_eq!(conf.server.port, 9090);
        assert_eq!(conf.postgres.max_connections, 16);
        assert_eq!(conf.service.tasks.deliver_notifications.batch_size, 100);
    }

    #[test]
    fn passes_task_settings_to_service() {
        let mut conf = Config::default();
        conf.service.tasks.deliver_notifications.batch_size = 7;

        let service: service::Config = conf.service.into();

        assert_eq!(service.deliver_notifications.batch_size, 7);
        assert_eq!(
            service.deliver_notifications.interval,
            time::Duration::from_secs(5),
        );
    }
}
