//! Environment configuration.
//!
//! | variable                | meaning                                  | default  |
//! |-------------------------|------------------------------------------|----------|
//! | `STRATA_DATABASE_URL`   | connection URL; its scheme picks dialect | required |
//! | `STRATA_TABLE_PREFIX`   | prefix of every physical table name      | empty    |
//! | `STRATA_AUTO_INCREMENT` | starting key value of new tables         | `1`      |
//!
//! A `.env` file in the working directory (or a parent) is loaded first
//! when present.

use crate::{Dialect, Error, MigrateOptions, Result};

pub const DATABASE_URL: &str = "STRATA_DATABASE_URL";
pub const TABLE_PREFIX: &str = "STRATA_TABLE_PREFIX";
pub const AUTO_INCREMENT: &str = "STRATA_AUTO_INCREMENT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub dialect: Dialect,
    pub table_prefix: String,
    pub auto_increment: i64,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `var`, which returns a variable's value
    /// if it is set.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = var(DATABASE_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{DATABASE_URL} is not set")))?;
        let dialect = dialect_for_url(&database_url)?;

        let table_prefix = var(TABLE_PREFIX).unwrap_or_default();

        let auto_increment = match var(AUTO_INCREMENT) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::Config(format!("{AUTO_INCREMENT} must be an integer, got `{raw}`"))
            })?,
            None => 1,
        };

        Ok(Self {
            database_url,
            dialect,
            table_prefix,
            auto_increment,
        })
    }

    pub fn migrate_options(&self) -> MigrateOptions {
        MigrateOptions {
            table_prefix: self.table_prefix.clone(),
            initial_auto_increment: self.auto_increment,
        }
    }
}

/// Pick the dialect from a connection URL's scheme.
pub fn dialect_for_url(url: &str) -> Result<Dialect> {
    let scheme = url
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .ok_or_else(|| Error::Config(format!("`{url}` is not a connection URL")))?;

    match scheme.as_str() {
        "postgres" | "postgresql" => Ok(Dialect::Postgres),
        "mysql" | "mariadb" => Ok(Dialect::MySql),
        other => Err(Error::Config(format!("unsupported database scheme `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&[(DATABASE_URL, "mysql://root@localhost/app")]))
            .unwrap();
        assert_eq!(config.dialect, Dialect::MySql);
        assert_eq!(config.table_prefix, "");
        assert_eq!(config.auto_increment, 1);
    }

    #[test]
    fn test_migrate_options() {
        let config = Config::from_vars(vars(&[
            (DATABASE_URL, "postgres://localhost/app"),
            (TABLE_PREFIX, "app_"),
            (AUTO_INCREMENT, "1000"),
        ]))
        .unwrap();
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(
            config.migrate_options(),
            MigrateOptions {
                table_prefix: "app_".into(),
                initial_auto_increment: 1000,
            }
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(Config::from_vars(vars(&[])), Err(Error::Config(_))));
        assert!(matches!(
            Config::from_vars(vars(&[(DATABASE_URL, "sqlite://db")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_vars(vars(&[
                (DATABASE_URL, "mysql://localhost/app"),
                (AUTO_INCREMENT, "many"),
            ])),
            Err(Error::Config(_))
        ));
    }
}
