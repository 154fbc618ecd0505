//! Connection pools for the supported backends.

use crate::{Config, Connection, Dialect, Result};
use deadpool_postgres::{Pool, Runtime};
use tokio_postgres::NoTls;

/// Build a Postgres pool for `url`. Connections are opened lazily.
pub fn connect_postgres(url: &str) -> Result<Pool> {
    let mut cfg = deadpool_postgres::Config::new();
    cfg.url = Some(url.to_string());
    Ok(cfg.create_pool(Some(Runtime::Tokio1), NoTls)?)
}

/// Build a MySQL pool for `url`. Connections are opened lazily.
#[cfg(feature = "mysql")]
pub fn connect_mysql(url: &str) -> Result<mysql_async::Pool> {
    let opts = mysql_async::Opts::from_url(url)
        .map_err(|e| crate::Error::Config(format!("invalid mysql url: {e}")))?;
    Ok(mysql_async::Pool::new(opts))
}

/// Build a pool for the configured database.
pub fn connect(config: &Config) -> Result<Box<dyn Connection>> {
    match config.dialect {
        Dialect::Postgres => Ok(Box::new(connect_postgres(&config.database_url)?)),
        #[cfg(feature = "mysql")]
        Dialect::MySql => Ok(Box::new(connect_mysql(&config.database_url)?)),
        #[cfg(not(feature = "mysql"))]
        Dialect::MySql => Err(crate::Error::Config(
            "mysql support requires the `mysql` feature".to_string(),
        )),
    }
}
