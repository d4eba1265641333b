use super::error::{CouchDaoError, CouchResult};

/// Database holding room documents when `COUCH_DB` is not set.
pub const DEFAULT_DATABASE: &str = "heist_rooms";

/// Connection settings of the CouchDB room store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL`, `COUCH_DB`, `COUCH_USERNAME` and `COUCH_PASSWORD`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build the settings from any variable source.
    ///
    /// Only the base URL is mandatory. Credentials are used when both halves are present.
    pub fn from_vars(lookup: impl Fn(&'static str) -> Option<String>) -> CouchResult<Self> {
        let present = |name| lookup(name).filter(|value: &String| !value.trim().is_empty());

        let base_url = present("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let (username, password) = match (present("COUCH_USERNAME"), present("COUCH_PASSWORD")) {
            (Some(username), Some(password)) => (Some(username), Some(password)),
            _ => (None, None),
        };

        Ok(Self {
            base_url,
            database: present("COUCH_DB").unwrap_or_else(|| DEFAULT_DATABASE.into()),
            username,
            password,
        })
    }
}
