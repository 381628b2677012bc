//! Database configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dialector::Dialector;
use crate::dsn::{self, DEFAULT_MYSQL_CHARSET, DriverKind, DsnFields};
use crate::error::{Error, Result};

/// Configuration for one named database.
///
/// Either set [`dialector`](Self::dialector) directly, or give a connection
/// string (`dsn`) plus `driver_type`, or give only structured fields and
/// let [`prepare`](Self::prepare) derive the rest.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Descriptive name, for logs only; the registry key is separate.
    pub name: String,
    /// Driver-native connection string.
    pub dsn: String,
    /// Driver kind (`mysql`, `postgres`, `sqlite`, `sqlserver`).
    pub driver_type: String,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Database name; for SQLite the file path or `:memory:`.
    pub db_name: String,
    /// MySQL character set; `utf8mb4` when left empty.
    pub charset: String,
    /// Idle connection cap; not applied, sqlx pools have no idle cap.
    pub max_idle_conns: u32,
    /// Upper bound on open connections (0 = driver default).
    pub max_open_conns: u32,
    /// Maximum lifetime of a connection, e.g. `"30m"` (0 = unlimited).
    #[serde(with = "humantime_serde")]
    pub conn_max_lifetime: Duration,
    /// Idle time after which a connection is reaped (0 = driver default).
    #[serde(with = "humantime_serde")]
    pub conn_max_idle_time: Duration,
    /// Pre-built driver handle; takes precedence over `dsn`.
    #[serde(skip)]
    pub dialector: Option<Dialector>,
}

impl DbConfig {
    /// Config with a pre-built driver handle.
    #[must_use]
    pub fn with_dialector(dialector: Dialector) -> Self {
        Self {
            driver_type: dialector.kind().as_str().to_owned(),
            dialector: Some(dialector),
            ..Self::default()
        }
    }

    /// Check the config is usable by the opener.
    ///
    /// # Errors
    ///
    /// - [`Error::NoConnectionString`] when there is neither a driver handle
    ///   nor a connection string.
    /// - [`Error::NoDriverHandle`] when a connection string is present but
    ///   no driver handle was resolved.
    pub fn validate(&self) -> Result<()> {
        if self.dialector.is_some() {
            return Ok(());
        }
        if self.dsn.is_empty() {
            Err(Error::NoConnectionString)
        } else {
            Err(Error::NoDriverHandle)
        }
    }

    /// Derive the connection string from the structured fields.
    ///
    /// An existing `dsn` is returned unchanged. Otherwise the driver's
    /// template is rendered and stored in `dsn`; for MySQL an empty
    /// `charset` is first set to `utf8mb4`. Unknown or empty driver kinds
    /// yield an empty string.
    pub fn auto_dsn(&mut self) -> String {
        if !self.dsn.is_empty() {
            return self.dsn.clone();
        }
        let Ok(kind) = self.driver_type.parse::<DriverKind>() else {
            return String::new();
        };
        if kind == DriverKind::MySql && self.charset.is_empty() {
            DEFAULT_MYSQL_CHARSET.clone_into(&mut self.charset);
        }
        self.dsn = dsn::render(kind, &self.dsn_fields());
        self.dsn.clone()
    }

    /// Derive the connection string and resolve a driver handle for it.
    ///
    /// No-op for the handle when one is already set.
    ///
    /// # Errors
    ///
    /// Propagates [`Dialector::resolve`] failures.
    pub fn prepare(&mut self) -> Result<()> {
        self.auto_dsn();
        if self.dialector.is_none() && !self.dsn.is_empty() {
            self.dialector = Some(Dialector::resolve(&self.driver_type, &self.dsn)?);
        }
        Ok(())
    }

    /// [`prepare`](Self::prepare) by value.
    pub fn prepared(mut self) -> Result<Self> {
        self.prepare()?;
        Ok(self)
    }

    /// Driver kind name and a password-free connection target, for display.
    #[must_use]
    pub fn describe(&self) -> (String, String) {
        let driver = match (&self.dialector, self.driver_type.as_str()) {
            (Some(dialector), _) => dialector.kind().as_str().to_owned(),
            (None, "") => "-".to_owned(),
            (None, driver) => driver.to_owned(),
        };
        let target = if self.dsn.is_empty() {
            "-".to_owned()
        } else {
            dsn::redact(&self.dsn)
        };
        (driver, target)
    }

    fn dsn_fields(&self) -> DsnFields<'_> {
        DsnFields {
            host: &self.host,
            port: self.port,
            user: &self.user,
            password: &self.password,
            db_name: &self.db_name,
            charset: &self.charset,
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("name", &self.name)
            .field("dsn", &dsn::redact(&self.dsn))
            .field("driver_type", &self.driver_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("db_name", &self.db_name)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("max_open_conns", &self.max_open_conns)
            .field("dialector", &self.dialector)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(driver: &str) -> DbConfig {
        DbConfig {
            driver_type: driver.into(),
            host: "localhost".into(),
            user: "root".into(),
            password: "password".into(),
            ..DbConfig::default()
        }
    }

    #[test]
    fn test_auto_dsn_mysql_defaults_charset() {
        let mut config = DbConfig {
            port: 3306,
            db_name: "testdb".into(),
            ..fields("mysql")
        };
        assert_eq!(
            config.auto_dsn(),
            "root:password@tcp(localhost:3306)/testdb?charset=utf8mb4&parseTime=True&loc=Local"
        );
        assert_eq!(config.charset, "utf8mb4");
        let rendered = config.auto_dsn();
        assert_eq!(config.dsn, rendered);
    }

    #[test]
    fn test_auto_dsn_mysql_keeps_charset() {
        let mut config = DbConfig {
            port: 3306,
            db_name: "testdb".into(),
            charset: "latin1".into(),
            ..fields("mysql")
        };
        assert!(config.auto_dsn().contains("charset=latin1"));
    }

    #[test]
    fn test_auto_dsn_postgres() {
        let mut config = DbConfig {
            port: 5432,
            user: "postgres".into(),
            password: "pgpass".into(),
            db_name: "postgresdb".into(),
            ..fields("postgres")
        };
        assert_eq!(
            config.auto_dsn(),
            "host=localhost port=5432 user=postgres password=pgpass dbname=postgresdb sslmode=disable"
        );
        assert!(config.charset.is_empty());
    }

    #[test]
    fn test_auto_dsn_existing_is_untouched() {
        let mut config = DbConfig {
            dsn: "custom".into(),
            port: 3306,
            ..fields("mysql")
        };
        assert_eq!(config.auto_dsn(), "custom");
        assert!(config.charset.is_empty());
    }

    #[test]
    fn test_auto_dsn_unknown_driver_is_empty() {
        let mut config = fields("oracle");
        assert_eq!(config.auto_dsn(), "");
        assert!(config.dsn.is_empty());
        assert_eq!(DbConfig::default().auto_dsn(), "");
    }

    #[test]
    fn test_auto_dsn_alias_driver_is_empty() {
        for driver in ["postgresql", "mariadb", "MySQL"] {
            let mut config = DbConfig {
                port: 1,
                db_name: "d".into(),
                ..fields(driver)
            };
            assert_eq!(config.auto_dsn(), "", "driver {driver}");
            assert!(config.charset.is_empty());
        }
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            DbConfig::default().validate(),
            Err(Error::NoConnectionString)
        ));

        let with_dsn = DbConfig {
            dsn: "root:pw@tcp(localhost:3306)/db".into(),
            ..DbConfig::default()
        };
        assert!(matches!(with_dsn.validate(), Err(Error::NoDriverHandle)));

        let with_handle = DbConfig::with_dialector(Dialector::sqlite(":memory:").unwrap());
        assert!(with_handle.validate().is_ok());
        assert_eq!(with_handle.driver_type, "sqlite");
    }

    #[test]
    fn test_prepare_resolves_handle() {
        let config = DbConfig {
            driver_type: "sqlite".into(),
            db_name: ":memory:".into(),
            ..DbConfig::default()
        }
        .prepared()
        .unwrap();
        assert_eq!(config.dsn, ":memory:");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prepare_unknown_driver_with_dsn() {
        let mut config = DbConfig {
            driver_type: "oracle".into(),
            dsn: "whatever".into(),
            ..DbConfig::default()
        };
        assert!(matches!(
            config.prepare(),
            Err(Error::UnknownDriverType { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = DbConfig {
            port: 3306,
            db_name: "app".into(),
            password: "hunter2".into(),
            ..fields("mysql")
        };
        config.auto_dsn();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_deserialize_yaml_with_durations() {
        let config: DbConfig = serde_yaml::from_str(
            "driver_type: postgres\nhost: db1\nport: 5432\nmax_idle_conns: 10\nconn_max_lifetime: 30m\n",
        )
        .unwrap();
        assert_eq!(config.port, 5432);
        assert_eq!(config.max_idle_conns, 10);
        assert_eq!(config.conn_max_lifetime, Duration::from_secs(1800));
        assert_eq!(config.conn_max_idle_time, Duration::ZERO);
    }
}
