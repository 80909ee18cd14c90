// ABOUTME: Parses backup configuration files and command-line overrides
// ABOUTME: Produces the connection settings and the validated export request

use crate::dump::{Destination, ExportRequest};
use crate::error::{DumpError, Result};
use crate::filters::TableFilter;
use crate::mysql::ConnectionConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "./.backup.toml";
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Contents of a backup config file
///
/// ```toml
/// host = "127.0.0.1"
/// port = 3306
/// user = "root"
/// password = "secret"
/// database = "shop"
/// tables = ["users", "orders"]
/// ignores = ["orders"]
/// outfile = "shop.sql"
/// limit = 500
/// ```
#[derive(Clone, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// Allow-list; empty exports every table
    #[serde(default)]
    pub tables: Vec<String>,
    /// Tables whose rows are left out
    #[serde(default)]
    pub ignores: Vec<String>,
    #[serde(default)]
    pub outfile: Option<String>,
    /// Rows per INSERT statement
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_user() -> String {
    "root".to_string()
}

fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: String::new(),
            database: String::new(),
            tables: Vec::new(),
            ignores: Vec::new(),
            outfile: None,
            limit: default_limit(),
        }
    }
}

impl std::fmt::Debug for BackupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("tables", &self.tables)
            .field("ignores", &self.ignores)
            .field("outfile", &self.outfile)
            .field("limit", &self.limit)
            .finish()
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub output: Option<String>,
    pub limit: Option<u64>,
    pub tables: Option<Vec<String>>,
    pub ignores: Option<Vec<String>>,
}

pub fn parse_config(raw: &str) -> Result<BackupConfig> {
    toml::from_str(raw).map_err(|e| DumpError::config(format!("Failed to parse config: {}", e)))
}

pub fn load_config_from_file(path: &Path) -> Result<BackupConfig> {
    let raw = fs::read_to_string(path).map_err(|e| {
        DumpError::config(format!(
            "Failed to read config file at {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_config(&raw).map_err(|e| match e {
        DumpError::Config(msg) => DumpError::config(format!("{} ({})", msg, path.display())),
        other => other,
    })
}

impl BackupConfig {
    /// Applies command-line overrides; a URL replaces every connection field
    pub fn apply(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(url) = overrides.url {
            let conn = ConnectionConfig::from_url(&url)?;
            self.host = conn.host;
            self.port = conn.port;
            self.user = conn.user;
            self.password = conn.password;
            self.database = conn.database;
        }
        if let Some(output) = overrides.output {
            self.outfile = Some(output);
        }
        if let Some(limit) = overrides.limit {
            self.limit = limit;
        }
        if let Some(tables) = overrides.tables {
            self.tables = tables;
        }
        if let Some(ignores) = overrides.ignores {
            self.ignores = ignores;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(DumpError::config("'database' must be set"));
        }
        if self.limit == 0 {
            return Err(DumpError::config("'limit' must be greater than zero"));
        }
        if self.host.trim().is_empty() {
            return Err(DumpError::config("'host' must not be empty"));
        }
        Ok(())
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }

    /// Output target; defaults to `<database>.sql`, `-` means stdout
    pub fn destination(&self) -> Destination {
        match self.outfile.as_deref().map(str::trim) {
            Some("-") => Destination::Stdout,
            Some(path) if !path.is_empty() => Destination::File(PathBuf::from(path)),
            _ => Destination::File(PathBuf::from(format!("{}.sql", self.database))),
        }
    }

    pub fn export_request(&self) -> Result<ExportRequest> {
        self.validate()?;

        Ok(ExportRequest {
            schema: self.database.clone(),
            filter: TableFilter::new(self.tables.clone(), self.ignores.clone()),
            page_size: self.limit,
            destination: self.destination(),
        })
    }
}
