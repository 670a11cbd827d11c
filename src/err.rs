//! Error types shared by the query engine.

/// Fatal configuration errors.
///
/// These abort the whole query and are never retried.  The message names the
/// missing or offending entity.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The case has no active variant set.
    #[error("case {0:?} has no active variant set")]
    NoActiveVariantSet(String),
    /// An index sample for an inheritance mode is not part of the pedigree.
    #[error("index sample {0:?} not found in pedigree of case {1:?}")]
    IndexNotInPedigree(String, String),
    /// The same extender kind was registered twice in one builder.
    #[error("extender {0} used twice in query builder {1:?}")]
    DuplicateExtender(String, String),
    /// The symbolic genotype pattern is unknown.
    #[error("unknown genotype pattern {0:?}")]
    UnknownGenotypePattern(String),
    /// A settings value has the wrong type or an unknown value.
    #[error("invalid value for setting {key:?}: {message}")]
    InvalidSetting { key: String, message: String },
    /// Reloading stored results of a case requires a query id.
    #[error("reloading stored results of case {0:?} requires a query id")]
    MissingQueryId(String),
}
