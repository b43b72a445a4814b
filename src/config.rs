use std::time::Duration;

/// Connection settings for the ledger database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// sqlx connection URL, e.g. `sqlite:simple_bank.db`
    pub database_url: String,
    pub max_connections: u32,
    /// How long a connection waits on a locked database before giving up
    pub busy_timeout: Duration,
    /// Upper bound on a single transaction's unit of work (none by default)
    pub tx_timeout: Option<Duration>,
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:simple_bank.db".to_string(),
            max_connections: 10,
            busy_timeout: Duration::from_secs(5),
            tx_timeout: None,
            create_if_missing: false,
        }
    }
}

impl StoreConfig {
    /// Settings for a SQLite file at `path`, everything else defaulted.
    pub fn for_path(path: &str) -> Self {
        Self {
            database_url: format!("sqlite:{}", path),
            ..Self::default()
        }
    }

    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_tx_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tx_timeout = timeout;
        self
    }
}
