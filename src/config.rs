use crate::error::{BadEnvVarSnafu, ParsePortSnafu, StudentResult, UnknownStorageSnafu};
use dotenvy::var;
use secrecy::{ExposeSecret, SecretString};
use snafu::ResultExt;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    server_config: Arc<ServerConfig>,
    storage: StorageConfig,
}

#[derive(Clone, Debug)]
pub enum StorageConfig {
    Postgres(Arc<DbConfig>),
    Memory,
}

impl RuntimeConfiguration {
    pub fn new() -> StudentResult<Self> {
        let storage = match var("STUDENTS_STORAGE") {
            Err(_) => StorageConfig::Postgres(Arc::new(DbConfig::new()?)),
            Ok(kind) => match kind.trim().to_ascii_lowercase().as_str() {
                "" | "postgres" => StorageConfig::Postgres(Arc::new(DbConfig::new()?)),
                "memory" => StorageConfig::Memory,
                _ => return UnknownStorageSnafu { found: kind }.fail(),
            },
        };

        Ok(Self {
            server_config: Arc::new(ServerConfig::new()),
            storage,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            server_config: Arc::new(ServerConfig {
                server_ip: "127.0.0.1:0".to_string(),
                cors_origin: "http://localhost:3000".to_string(),
            }),
            storage: StorageConfig::Memory,
        }
    }

    pub fn server_config(&self) -> Arc<ServerConfig> {
        self.server_config.clone()
    }

    pub const fn storage(&self) -> &StorageConfig {
        &self.storage
    }
}

#[derive(Debug)]
pub struct ServerConfig {
    pub server_ip: String,
    pub cors_origin: String,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            server_ip: var("STUDENTS_SERVER_IP").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            cors_origin: var("STUDENTS_CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct DbConfig {
    user: String,
    password: SecretString,
    path: String,
    port: u16,
    database: String,
}

impl DbConfig {
    pub fn new() -> StudentResult<Self> {
        let get_env_var = |name| var(name).context(BadEnvVarSnafu { name });

        Ok(Self {
            user: get_env_var("DB_USER")?,
            password: SecretString::from(get_env_var("DB_PASSWORD")?),
            path: get_env_var("DB_PATH")?,
            port: get_env_var("DB_PORT")?.parse().context(ParsePortSnafu)?,
            database: get_env_var("DB_NAME")?,
        })
    }

    pub fn get_db_path(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.password.expose_secret(),
            self.path,
            self.port,
            self.database
        )
    }
}
