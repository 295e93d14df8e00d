use thiserror::Error;

/// Canonical result for treegen.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Admission control refused the request. Distinct from `Ok(0)`, which
    /// means no tree satisfies the constraints.
    #[error("Request rejected for N={n}, M={m}: {reason}")]
    Rejected { n: usize, m: usize, reason: String },

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Rejected { .. })
    }
}
