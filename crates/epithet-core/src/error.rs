/// Unified error type covering all failure modes in the epithet schema pipeline.
///
/// Configuration and routing errors always name the offending alias so the
/// message alone is enough to locate the bad declaration. `VersionConflict`
/// is a dedicated variant (not a generic cluster failure) so callers can
/// decide to reload-and-retry without string matching.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The declared configuration is structurally invalid for its strategy.
    #[error("invalid config for {alias}: {reason}")]
    InvalidConfig {
        /// Alias (or settings group) whose declaration is invalid.
        alias: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A routing request could not be resolved to a physical index.
    #[error("cannot route for {alias}: {reason}")]
    Routing {
        /// Alias the caller tried to route against.
        alias: String,
        /// Why routing failed.
        reason: String,
    },

    /// Another writer advanced the control document first. Reload and retry.
    #[error(
        "version conflict writing the control document: version {attempted} was already taken by another writer; reload and retry"
    )]
    VersionConflict {
        /// The version this writer attempted to claim.
        attempted: u64,
    },

    /// The control document is missing, unreadable, or does not parse.
    #[error("control document error: {reason}")]
    ControlDocument {
        /// What went wrong.
        reason: String,
    },

    /// Post-cutover verification found the target's recorded fields diverging
    /// from the source's. Enforcement is deliberately skipped; the cluster
    /// alias state is left as-is for manual correction.
    #[error(
        "cutover verification failed for {source_index} -> {target_index}: {reason}; cluster alias state left for manual correction"
    )]
    CutoverVerification {
        /// Index the data was copied out of.
        source_index: String,
        /// Index the data was copied into.
        target_index: String,
        /// The observed mismatch.
        reason: String,
    },

    /// Schema payload (de)serialization failed.
    #[error("schema serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A failure from the search-cluster collaborator that is not one of the
    /// tolerated convergence errors.
    #[error("cluster error: {source}")]
    Cluster {
        /// The underlying transport or API error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SchemaError {
    /// Shorthand for a configuration error attributed to `alias`.
    pub fn invalid_config(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            alias: alias.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a routing error attributed to `alias`.
    pub fn routing(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Routing {
            alias: alias.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an arbitrary cluster-side error.
    pub fn cluster<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Cluster {
            source: Box::new(source),
        }
    }
}

/// Convenience alias used throughout the epithet crates.
pub type SchemaResult<T> = Result<T, SchemaError>;
