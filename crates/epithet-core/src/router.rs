//! Query-time routing: map a routing key to the physical index (or alias)
//! a document or query belongs to.

use crate::error::{SchemaError, SchemaResult};
use crate::schema::RoutingKey;

/// A router built by a strategy from the current schema. Routers close over
/// the schema they were built from; the store invalidates its router cache
/// on every schema mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Router {
    /// Time/bucket-ranged membership: pick the most specific bucket not
    /// newer than the key.
    Range {
        alias: String,
        /// `(routing, index name)` pairs in descending routing order.
        buckets: Vec<(RoutingKey, String)>,
    },
    /// A single fixed index, whatever the key.
    Fixed { index: String },
    /// The alias itself is the answer: it always holds exactly the current
    /// index, so queries address the alias directly.
    Alias { alias: String },
}

impl Router {
    /// Resolve `key` to an index (or alias) name.
    ///
    /// Range semantics: scan buckets in descending routing order and return
    /// the first whose routing is `<= key`; a key older than every bucket
    /// falls back to the oldest bucket.
    pub fn route(&self, key: &RoutingKey) -> SchemaResult<&str> {
        match self {
            Self::Range { alias, buckets } => {
                for (routing, index) in buckets {
                    if routing <= key {
                        return Ok(index);
                    }
                }
                buckets
                    .last()
                    .map(|(_, index)| index.as_str())
                    .ok_or_else(|| SchemaError::routing(alias.clone(), "alias has no indexes"))
            }
            Self::Fixed { index } => Ok(index),
            Self::Alias { alias } => Ok(alias),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(y: i32, m: u32, d: u32) -> RoutingKey {
        RoutingKey::from_date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn monthly_router() -> Router {
        Router::Range {
            alias: "events".to_owned(),
            buckets: vec![
                (key(2014, 2, 1), "201402".to_owned()),
                (key(2014, 1, 1), "201401".to_owned()),
            ],
        }
    }

    #[test]
    fn range_picks_the_bucket_not_newer_than_the_key() {
        let router = monthly_router();
        assert_eq!(router.route(&key(2014, 1, 1)).unwrap(), "201401");
        assert_eq!(router.route(&key(2014, 1, 15)).unwrap(), "201401");
        assert_eq!(router.route(&key(2014, 2, 1)).unwrap(), "201402");
        assert_eq!(router.route(&key(2014, 6, 1)).unwrap(), "201402");
    }

    #[test]
    fn range_falls_back_to_the_oldest_bucket() {
        let router = monthly_router();
        assert_eq!(router.route(&key(2013, 12, 1)).unwrap(), "201401");
    }

    #[test]
    fn empty_range_is_a_routing_error() {
        let router = Router::Range {
            alias: "events".to_owned(),
            buckets: Vec::new(),
        };
        let err = router.route(&key(2014, 1, 1)).unwrap_err();
        assert!(matches!(err, SchemaError::Routing { .. }));
        assert!(err.to_string().contains("events"));
    }

    #[test]
    fn fixed_ignores_the_key() {
        let router = Router::Fixed {
            index: "users".to_owned(),
        };
        assert_eq!(router.route(&RoutingKey::Text("anything".into())).unwrap(), "users");
        assert_eq!(router.route(&key(1999, 1, 1)).unwrap(), "users");
    }

    #[test]
    fn alias_router_answers_the_alias_name() {
        let router = Router::Alias {
            alias: "events_current".to_owned(),
        };
        assert_eq!(router.route(&key(2014, 1, 1)).unwrap(), "events_current");
    }
}
