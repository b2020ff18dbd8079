use super::error::{CouchDaoError, CouchResult};

/// Runtime configuration describing how to reach the CouchDB database backing the KV store.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, e.g. `http://couch:5984`.
    pub base_url: String,
    /// Database holding the KV documents.
    pub database: String,
    /// Basic-auth user.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
}

impl CouchConfig {
    /// Construct a configuration from explicit base URL and database name.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            username: None,
            password: None,
        }
    }

    /// Attach basic-auth credentials to the configuration.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Build a configuration from a variable lookup, returning `None` when no base URL is set.
    pub fn from_lookup<F>(lookup: F) -> CouchResult<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(base_url) = lookup("COUCH_BASE_URL").filter(|value| !value.is_empty()) else {
            return Ok(None);
        };
        let database = lookup("COUCH_DB").ok_or(CouchDaoError::MissingEnvVar { var: "COUCH_DB" })?;

        let mut config = Self::new(base_url, database);

        if let (Some(username), Some(password)) = (lookup("COUCH_USERNAME"), lookup("COUCH_PASSWORD"))
        {
            config = config.with_credentials(username, password);
        }

        Ok(Some(config))
    }
}
