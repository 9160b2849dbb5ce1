use std::time::Duration;

use thiserror::Error;

/// Failures inside the session ledger. These never leave the ledger's public
/// operations; they are logged and turned into empty results.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("persistence call exceeded {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rule table {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rule table contains an empty keyword or trigger")]
    EmptyKeyword,

    #[error("rule table has no escalation triggers")]
    NoEscalationTriggers,

    #[error("escalation response must mention \"connecting you with a live agent\"")]
    EscalationTextMissingPhrase,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error("failed to create upload folder {path}: {source}")]
    UploadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server runtime failure: {0}")]
    Serve(#[source] std::io::Error),
}
