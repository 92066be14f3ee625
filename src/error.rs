use std::path::PathBuf;

/// Process-level error carrying the exit code the `rocks` binary returns.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Why a site dataset could not produce a curve.
///
/// `NotFound`, `Empty` and `Unreadable` are recoverable: a comparison run
/// records a dead row for the site and moves on. `InvalidArea` means the
/// normalising area is unusable, which would silently corrupt every statistic,
/// so it is promoted to a fatal [`AppError`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset '{}' not found", path.display())]
    NotFound { path: PathBuf },

    #[error("no boulders in '{}'", path.display())]
    Empty { path: PathBuf },

    #[error("failed to read '{}': {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("reference area {area} for '{}' must be finite and > 0", path.display())]
    InvalidArea { path: PathBuf, area: f64 },
}

impl DatasetError {
    /// Whether a multi-site run may continue past this failure.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DatasetError::InvalidArea { .. })
    }
}

impl From<DatasetError> for AppError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::Empty { .. } => AppError::new(3, err.to_string()),
            _ => AppError::new(2, err.to_string()),
        }
    }
}

/// Why a model could not be fitted to a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FitFailure {
    #[error("no points inside the fit range")]
    EmptyRange,

    #[error("regression needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("log-log regression requires strictly positive inputs")]
    NonPositive,

    #[error("input has zero variance")]
    ZeroVariance,

    #[error("solver did not converge")]
    NoConvergence,
}
