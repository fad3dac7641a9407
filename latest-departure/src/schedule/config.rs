//! Connection settings for the relational schedule store.

use super::ScheduleError;

/// Default PostgreSQL port.
const DEFAULT_PORT: u16 = 5432;

/// Configuration for connecting to the relational schedule store.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub dbname: String,
}

impl DatabaseConfig {
    /// Create a new config.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        dbname: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
            dbname: dbname.into(),
        }
    }

    /// Read `DBUSER`, `DBPASS`, `DBHOST`, `DBPORT` and `DBNAME` from the environment.
    ///
    /// `DBPORT` defaults to 5432 when unset.
    pub fn from_env() -> Result<Self, ScheduleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScheduleError> {
        let require = |key: &str| {
            lookup(key).ok_or_else(|| ScheduleError::Connection(format!("{key} is not set")))
        };

        let port = match lookup("DBPORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ScheduleError::Connection(format!("DBPORT is not a port: {raw}")))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            user: require("DBUSER")?,
            password: require("DBPASS")?,
            host: require("DBHOST")?,
            port,
            dbname: require("DBNAME")?,
        })
    }

    /// Render as a key/value connection string.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            quote(&self.host),
            self.port,
            quote(&self.user),
            quote(&self.password),
            quote(&self.dbname)
        )
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .finish()
    }
}

/// Quote a connection-string value, escaping backslashes and single quotes.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
