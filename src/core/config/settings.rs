use std::path::PathBuf;

use super::parsing::{
    env_flag, env_optional, env_or_default, normalize_prefix, parse_bool, parse_cors_origins,
    parse_environment, parse_positive_usize, parse_u16, parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, CacheSettings, ChatSettings, ConfigError, CorsSettings,
    DatabaseSettings, ExportSettings, JobSettings, MailSettings, RedisSettings, RuntimeSettings,
    SecuritySettings, SeedSettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("QUIZMASTER_HOST", "0.0.0.0");
        let port = env_or_default("QUIZMASTER_PORT", "8000");

        let environment = parse_environment(
            env_optional("QUIZMASTER_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("QUIZMASTER_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Quiz Master API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_prefix = normalize_prefix(env_or_default("API_PREFIX", "/api"));
        let app_base_url =
            env_or_default("APP_BASE_URL", "http://localhost:8080").trim_end_matches('/').to_string();

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "60"),
        )?;
        let refresh_token_expire_days = parse_u64(
            "REFRESH_TOKEN_EXPIRE_DAYS",
            env_or_default("REFRESH_TOKEN_EXPIRE_DAYS", "30"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "quizmaster");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "quizmaster");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DATABASE_MAX_CONNECTIONS", env_or_default("DATABASE_MAX_CONNECTIONS", "20"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let cache_enabled =
            env_optional("CACHE_ENABLED").map(|value| parse_bool(&value)).unwrap_or(true);
        let cache_key_prefix = env_or_default("CACHE_KEY_PREFIX", "quizmaster");

        let mail_api_url = env_or_default("MAIL_API_URL", "");
        let mail_api_key = env_or_default("MAIL_API_KEY", "");
        let mail_from = env_or_default("MAIL_FROM", "Quiz Master <noreply@quizmaster.local>");
        let mail_timeout =
            parse_u64("MAIL_TIMEOUT_SECONDS", env_or_default("MAIL_TIMEOUT_SECONDS", "30"))?;
        let chat_webhook_url = env_or_default("CHAT_WEBHOOK_URL", "");

        let export_dir = PathBuf::from(env_or_default("EXPORT_DIR", "exports"));
        let export_retention_days =
            parse_u64("EXPORT_RETENTION_DAYS", env_or_default("EXPORT_RETENTION_DAYS", "7"))?;

        let worker_concurrency = parse_positive_usize(
            "JOB_WORKER_CONCURRENCY",
            env_or_default("JOB_WORKER_CONCURRENCY", "2"),
        )?;
        let time_limit_seconds =
            parse_u64("JOB_TIME_LIMIT_SECONDS", env_or_default("JOB_TIME_LIMIT_SECONDS", "1800"))?;
        let poll_interval_seconds = parse_u64(
            "JOB_POLL_INTERVAL_SECONDS",
            env_or_default("JOB_POLL_INTERVAL_SECONDS", "2"),
        )?;
        let finished_retention_days = parse_u64(
            "JOB_RETENTION_DAYS",
            env_or_default("JOB_RETENTION_DAYS", "30"),
        )?;

        let first_superuser_username = env_or_default("FIRST_SUPERUSER_USERNAME", "admin");
        let first_superuser_email =
            env_or_default("FIRST_SUPERUSER_EMAIL", "admin@quizmaster.com");
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");

        let log_level = env_or_default("QUIZMASTER_LOG_LEVEL", "info");
        let json = env_flag("QUIZMASTER_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_prefix, app_base_url },
            security: SecuritySettings {
                secret_key,
                access_token_expire_minutes,
                refresh_token_expire_days,
                algorithm,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            cache: CacheSettings { enabled: cache_enabled, key_prefix: cache_key_prefix },
            mail: MailSettings {
                api_url: mail_api_url,
                api_key: mail_api_key,
                from_address: mail_from,
                request_timeout_seconds: mail_timeout,
            },
            chat: ChatSettings { webhook_url: chat_webhook_url },
            exports: ExportSettings { dir: export_dir, retention_days: export_retention_days },
            jobs: JobSettings {
                worker_concurrency,
                time_limit_seconds,
                poll_interval_seconds,
                finished_retention_days,
            },
            admin: AdminSettings {
                first_superuser_username,
                first_superuser_email,
                first_superuser_password,
            },
            seed: SeedSettings { default_data: env_flag("SEED_DEFAULT_DATA") },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn cache(&self) -> &CacheSettings {
        &self.cache
    }

    pub(crate) fn mail(&self) -> &MailSettings {
        &self.mail
    }

    pub(crate) fn chat(&self) -> &ChatSettings {
        &self.chat
    }

    pub(crate) fn exports(&self) -> &ExportSettings {
        &self.exports
    }

    pub(crate) fn jobs(&self) -> &JobSettings {
        &self.jobs
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn seed(&self) -> &SeedSettings {
        &self.seed
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs.time_limit_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "JOB_TIME_LIMIT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.jobs.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "JOB_POLL_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.security.access_token_expire_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: "0".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if !self.runtime.strict_config {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }
        if !self.mail.api_url.is_empty() && self.mail.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("MAIL_API_KEY"));
        }

        Ok(())
    }
}
