/// Failures at the search-cluster boundary.
///
/// Several variants represent convergence already achieved rather than real
/// failure (an index that already exists, a mapping merge the cluster
/// refuses); callers classify them with [`ClusterError::is_already_exists`]
/// and friends instead of string matching.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Index creation raced with an existing index.
    #[error("index {index} already exists")]
    IndexAlreadyExists { index: String },

    /// The named index does not exist.
    #[error("index {index} not found")]
    IndexNotFound { index: String },

    /// Create-only document write found the document already present.
    #[error("document {index}/{id} already exists")]
    DocumentAlreadyExists { index: String, id: String },

    /// An externally-versioned write lost the race: the attempted version is
    /// not strictly newer than what the cluster holds.
    #[error("version conflict on {index}/{id}: attempted version {attempted} was refused")]
    VersionConflict {
        index: String,
        id: String,
        attempted: u64,
    },

    /// The cluster rejected a mapping merge.
    #[error("mapping merge conflict on {index}: {reason}")]
    MappingConflict { index: String, reason: String },

    /// A scroll cursor is unknown or has expired.
    #[error("scroll cursor {scroll_id} is unknown or expired")]
    UnknownScroll { scroll_id: String },

    /// Transport failure or an API error not covered above.
    #[error("cluster request failed: {reason}")]
    Request { reason: String },
}

impl ClusterError {
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::IndexAlreadyExists { .. } | Self::DocumentAlreadyExists { .. }
        )
    }

    #[must_use]
    pub const fn is_mapping_conflict(&self) -> bool {
        matches!(self, Self::MappingConflict { .. })
    }

    #[must_use]
    pub const fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    /// Wrap a transport-level error.
    pub fn request(reason: impl ToString) -> Self {
        Self::Request {
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias for cluster-facing calls.
pub type ClusterResult<T> = Result<T, ClusterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifiers_match_their_variants() {
        let exists = ClusterError::IndexAlreadyExists {
            index: "a".into(),
        };
        assert!(exists.is_already_exists());
        assert!(!exists.is_version_conflict());

        let conflict = ClusterError::VersionConflict {
            index: "ctl".into(),
            id: "master".into(),
            attempted: 3,
        };
        assert!(conflict.is_version_conflict());
        assert!(!conflict.is_already_exists());

        let mapping = ClusterError::MappingConflict {
            index: "a".into(),
            reason: "field type clash".into(),
        };
        assert!(mapping.is_mapping_conflict());
    }

    #[test]
    fn version_conflict_message_carries_the_attempted_version() {
        let err = ClusterError::VersionConflict {
            index: "ctl".into(),
            id: "master".into(),
            attempted: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("ctl/master"));
        assert!(msg.contains('4'));
    }
}
