use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Poise operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PoiseError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed manifest, constraint, version or index entry.
    #[error("Parse error: {message}")]
    #[diagnostic(help("Check pyproject.toml for syntax errors"))]
    Parse { message: String },

    /// The manifest parsed but violates an invariant (duplicate names, empty ranges, ...).
    #[error("Invalid manifest: {message}")]
    Manifest { message: String },

    /// Two or more declared ranges for the same package share no version.
    #[error("Version conflict: {message}")]
    #[diagnostic(help("Relax one of the conflicting constraints"))]
    Conflict { message: String },

    /// A package or version does not exist in the queried index.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The package index could not be located or read.
    #[error("Registry error: {message}")]
    #[diagnostic(help("Pass --index <path>, set POISE_INDEX, or configure [registry] index in ~/.poise/config.toml"))]
    Registry { message: String },

    /// The lock file is missing, unreadable or stale.
    #[error("Lock file error: {message}")]
    Lockfile { message: String },

    /// Resolution failed for a reason other than a conflict (search budget exhausted, ...).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type PoiseResult<T> = miette::Result<T>;
