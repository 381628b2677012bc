//! Driver handles: parsed, driver-specific connect options.
//!
//! A [`Dialector`] is what the opener actually connects with. It is either
//! supplied pre-built on a [`DbConfig`] or resolved from the config's
//! driver kind and connection string by [`Dialector::resolve`].

use std::fmt;
use std::str::FromStr;

use sqlx::Database as SqlxDatabase;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::pool::PoolOptions;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::sqlite::SqliteConnectOptions;

use crate::config::DbConfig;
use crate::database::Database;
use crate::dsn::DriverKind;
use crate::error::{Error, Result};

const MYSQL_DEFAULT_PORT: u16 = 3306;

/// Pre-built driver handle.
#[derive(Clone)]
pub enum Dialector {
    /// MySQL / MariaDB connect options
    MySql(MySqlConnectOptions),
    /// PostgreSQL connect options
    Postgres(PgConnectOptions),
    /// SQLite connect options
    Sqlite(SqliteConnectOptions),
    /// SQL Server; recognised, but no driver is linked in
    SqlServer {
        /// The `sqlserver://` URL
        url: String,
    },
}

impl Dialector {
    /// Resolve a handle for `driver` from a connection string.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownDriverType`] for unrecognised driver kinds.
    /// - [`Error::InvalidDsn`] if `dsn` cannot be parsed for that driver.
    pub fn resolve(driver: &str, dsn: &str) -> Result<Self> {
        match driver.parse::<DriverKind>()? {
            DriverKind::MySql => Self::mysql(dsn),
            DriverKind::Postgres => Self::postgres(dsn),
            DriverKind::Sqlite => Self::sqlite(dsn),
            DriverKind::SqlServer => Self::sqlserver(dsn),
        }
    }

    /// MySQL handle from `user:pass@tcp(host:port)/db?charset=...` or a
    /// `mysql://` / `mariadb://` URL.
    pub fn mysql(dsn: &str) -> Result<Self> {
        parse_mysql(dsn).map(Self::MySql)
    }

    /// PostgreSQL handle from `key=value` pairs or a `postgres://` URL.
    pub fn postgres(dsn: &str) -> Result<Self> {
        parse_postgres(dsn).map(Self::Postgres)
    }

    /// SQLite handle from a file path, `:memory:`, `file:` URI or `sqlite:` URL.
    pub fn sqlite(dsn: &str) -> Result<Self> {
        parse_sqlite(dsn).map(Self::Sqlite)
    }

    /// SQL Server handle from a `sqlserver://` URL.
    pub fn sqlserver(dsn: &str) -> Result<Self> {
        if !dsn.starts_with("sqlserver://") {
            return Err(Error::invalid_dsn("sqlserver", "expected a sqlserver:// URL"));
        }
        Ok(Self::SqlServer {
            url: dsn.to_owned(),
        })
    }

    /// Driver kind of this handle.
    #[must_use]
    pub const fn kind(&self) -> DriverKind {
        match self {
            Self::MySql(_) => DriverKind::MySql,
            Self::Postgres(_) => DriverKind::Postgres,
            Self::Sqlite(_) => DriverKind::Sqlite,
            Self::SqlServer { .. } => DriverKind::SqlServer,
        }
    }

    /// Open a pool tuned by `config`'s pool settings.
    ///
    /// # Errors
    ///
    /// - [`Error::Connect`] if the pool cannot be established.
    /// - [`Error::DriverUnavailable`] for SQL Server.
    pub async fn connect(&self, config: &DbConfig) -> Result<Database> {
        match self {
            Self::MySql(options) => pool_options(config)
                .connect_with(options.clone())
                .await
                .map(Database::MySql)
                .map_err(Error::Connect),
            Self::Postgres(options) => pool_options(config)
                .connect_with(options.clone())
                .await
                .map(Database::Postgres)
                .map_err(Error::Connect),
            Self::Sqlite(options) => pool_options(config)
                .connect_with(options.clone())
                .await
                .map(Database::Sqlite)
                .map_err(Error::Connect),
            Self::SqlServer { .. } => Err(Error::DriverUnavailable {
                driver: DriverKind::SqlServer.as_str(),
            }),
        }
    }
}

impl fmt::Debug for Dialector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dialector").field(&self.kind()).finish()
    }
}

/// Pool tuning from the config; zero values keep the driver defaults.
///
/// `max_idle_conns` is an upper bound and sqlx pools have no idle cap, so it
/// is not applied. Idle connections are reaped by `conn_max_idle_time`
/// instead, and `min_connections` stays at the driver default of zero.
fn pool_options<DB: SqlxDatabase>(config: &DbConfig) -> PoolOptions<DB> {
    let mut options = PoolOptions::<DB>::new();
    if config.max_open_conns > 0 {
        options = options.max_connections(config.max_open_conns);
    }
    if config.max_idle_conns > 0 {
        tracing::debug!(
            max_idle_conns = config.max_idle_conns,
            "Idle connection cap not supported by the pool, ignoring"
        );
    }
    if !config.conn_max_lifetime.is_zero() {
        options = options.max_lifetime(config.conn_max_lifetime);
    }
    if !config.conn_max_idle_time.is_zero() {
        options = options.idle_timeout(config.conn_max_idle_time);
    }
    options
}

// ---------------------------------------------------------------------------
// MySQL
// ---------------------------------------------------------------------------

fn parse_mysql(dsn: &str) -> Result<MySqlConnectOptions> {
    const DRIVER: &str = "mysql";

    if let Some(rest) = dsn.strip_prefix("mariadb://") {
        return parse_mysql(&format!("mysql://{rest}"));
    }
    if dsn.starts_with("mysql://") {
        return MySqlConnectOptions::from_str(dsn)
            .map_err(|err| Error::invalid_dsn(DRIVER, err.to_string()));
    }

    let (head, query) = dsn.split_once('?').unwrap_or((dsn, ""));
    let slash = head
        .rfind('/')
        .ok_or_else(|| Error::invalid_dsn(DRIVER, "missing '/' before the database name"))?;
    let (address, db_name) = (&head[..slash], &head[slash + 1..]);
    let (credentials, network) = match address.rfind('@') {
        Some(at) => (&address[..at], &address[at + 1..]),
        None => ("", address),
    };
    let (user, password) = credentials.split_once(':').unwrap_or((credentials, ""));

    let mut options = MySqlConnectOptions::new();
    if !user.is_empty() {
        options = options.username(user);
    }
    if !password.is_empty() {
        options = options.password(password);
    }

    if let Some(addr) = network.strip_prefix("tcp(").and_then(|s| s.strip_suffix(')')) {
        let (host, port) = match addr.rsplit_once(':') {
            Some((host, port)) => (host, parse_port(DRIVER, port)?),
            None => (addr, MYSQL_DEFAULT_PORT),
        };
        if !host.is_empty() {
            options = options.host(host);
        }
        options = options.port(port);
    } else if let Some(path) = network.strip_prefix("unix(").and_then(|s| s.strip_suffix(')')) {
        options = options.socket(path);
    } else if !network.is_empty() {
        return Err(Error::invalid_dsn(
            DRIVER,
            format!("unsupported network address '{network}'"),
        ));
    }

    if !db_name.is_empty() {
        options = options.database(db_name);
    }

    for (key, value) in query.split('&').filter_map(|pair| pair.split_once('=')) {
        if key == "charset" {
            let charset = value.split(',').next().unwrap_or(value);
            options = options.charset(charset);
        }
    }
    Ok(options)
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

fn parse_postgres(dsn: &str) -> Result<PgConnectOptions> {
    const DRIVER: &str = "postgres";

    if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
        return PgConnectOptions::from_str(dsn)
            .map_err(|err| Error::invalid_dsn(DRIVER, err.to_string()));
    }

    let mut options = PgConnectOptions::new_without_pgpass();
    for pair in dsn.split_whitespace() {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::invalid_dsn(DRIVER, format!("expected key=value, got '{pair}'")))?;
        options = match key.to_ascii_lowercase().as_str() {
            "host" => options.host(value),
            "port" => options.port(parse_port(DRIVER, value)?),
            "user" => options.username(value),
            "password" => options.password(value),
            "dbname" => options.database(value),
            "sslmode" => options.ssl_mode(
                PgSslMode::from_str(value)
                    .map_err(|err| Error::invalid_dsn(DRIVER, err.to_string()))?,
            ),
            "application_name" => options.application_name(value),
            "timezone" => options.options([("TimeZone", value)]),
            _ => {
                tracing::debug!(key, "Ignoring unsupported postgres connection parameter");
                options
            }
        };
    }
    Ok(options)
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

fn parse_sqlite(dsn: &str) -> Result<SqliteConnectOptions> {
    const DRIVER: &str = "sqlite";

    let parsed = match dsn {
        "" => return Err(Error::invalid_dsn(DRIVER, "empty database path")),
        ":memory:" | "file::memory:" => SqliteConnectOptions::from_str("sqlite::memory:"),
        url if url.starts_with("sqlite:") => SqliteConnectOptions::from_str(url),
        uri if uri.starts_with("file:") => {
            SqliteConnectOptions::from_str(&format!("sqlite://{}", &uri["file:".len()..]))
        }
        path => Ok(SqliteConnectOptions::new().filename(path)),
    };
    parsed
        .map(|options| options.create_if_missing(true))
        .map_err(|err| Error::invalid_dsn(DRIVER, err.to_string()))
}

fn parse_port(driver: &'static str, port: &str) -> Result<u16> {
    port.parse()
        .map_err(|_| Error::invalid_dsn(driver, format!("invalid port '{port}'")))
}
