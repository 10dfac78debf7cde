//! Bucket Properties Module
//!
//! Replication settings of a bucket and the diff used to converge them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

// == Quorum ==
/// A read/write quorum threshold, either a replica count or a symbolic value
/// resolved by the store against the bucket's `n_val`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuorumRepr", into = "QuorumRepr")]
pub enum Quorum {
    /// Exact number of replicas
    Count(u32),
    /// A single replica
    One,
    /// A majority of replicas
    Quorum,
    /// Every replica
    All,
    /// Whatever the bucket default is
    Default,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum QuorumRepr {
    Count(u32),
    Symbol(String),
}

impl TryFrom<QuorumRepr> for Quorum {
    type Error = CacheError;

    fn try_from(repr: QuorumRepr) -> Result<Self, Self::Error> {
        match repr {
            QuorumRepr::Count(n) => Ok(Quorum::Count(n)),
            QuorumRepr::Symbol(s) => s.parse(),
        }
    }
}

impl From<Quorum> for QuorumRepr {
    fn from(quorum: Quorum) -> Self {
        match quorum {
            Quorum::Count(n) => QuorumRepr::Count(n),
            symbolic => QuorumRepr::Symbol(symbolic.to_string()),
        }
    }
}

impl FromStr for Quorum {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one" => Ok(Quorum::One),
            "quorum" => Ok(Quorum::Quorum),
            "all" => Ok(Quorum::All),
            "default" => Ok(Quorum::Default),
            other => other
                .parse::<u32>()
                .map(Quorum::Count)
                .map_err(|_| CacheError::InvalidConfig(format!("Unknown quorum value: {s}"))),
        }
    }
}

impl fmt::Display for Quorum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quorum::Count(n) => write!(f, "{n}"),
            Quorum::One => f.write_str("one"),
            Quorum::Quorum => f.write_str("quorum"),
            Quorum::All => f.write_str("all"),
            Quorum::Default => f.write_str("default"),
        }
    }
}

// == Bucket Props ==
/// Replication properties of a bucket.
///
/// Unset fields are left alone when the props are sent to the store. Any other
/// property the store reports is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketProps {
    /// Replication factor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_val: Option<u32>,
    /// Read quorum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<Quorum>,
    /// Write quorum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<Quorum>,
    /// Durable write quorum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dw: Option<Quorum>,
    /// Quorum for deletes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rw: Option<Quorum>,
}

impl BucketProps {
    /// Returns the properties set on `self` whose value differs in `live`.
    pub fn diff(&self, live: &BucketProps) -> BucketProps {
        fn changed<T: PartialEq + Copy>(want: Option<T>, have: Option<T>) -> Option<T> {
            want.filter(|w| have != Some(*w))
        }

        BucketProps {
            n_val: changed(self.n_val, live.n_val),
            r: changed(self.r, live.r),
            w: changed(self.w, live.w),
            dw: changed(self.dw, live.dw),
            rw: changed(self.rw, live.rw),
        }
    }

    /// Returns true if no property is set.
    pub fn is_empty(&self) -> bool {
        *self == BucketProps::default()
    }

    /// Overlays every property set on `other` onto `self`.
    pub fn merge(&mut self, other: &BucketProps) {
        self.n_val = other.n_val.or(self.n_val);
        self.r = other.r.or(self.r);
        self.w = other.w.or(self.w);
        self.dw = other.dw.or(self.dw);
        self.rw = other.rw.or(self.rw);
    }
}

/// Wire envelope used by the store's props endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PropsEnvelope {
    pub props: BucketProps,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn desired() -> BucketProps {
        BucketProps {
            n_val: Some(2),
            r: Some(Quorum::Count(1)),
            w: Some(Quorum::Count(1)),
            dw: Some(Quorum::Count(0)),
            rw: Some(Quorum::Quorum),
        }
    }

    #[test]
    fn test_quorum_parse() {
        assert_eq!("quorum".parse::<Quorum>().unwrap(), Quorum::Quorum);
        assert_eq!("ALL".parse::<Quorum>().unwrap(), Quorum::All);
        assert_eq!("3".parse::<Quorum>().unwrap(), Quorum::Count(3));
        assert!("most".parse::<Quorum>().is_err());
    }

    #[test]
    fn test_quorum_json_forms() {
        assert_eq!(serde_json::to_string(&Quorum::Count(2)).unwrap(), "2");
        assert_eq!(serde_json::to_string(&Quorum::One).unwrap(), "\"one\"");
        assert_eq!(
            serde_json::from_str::<Quorum>("\"default\"").unwrap(),
            Quorum::Default
        );
        assert!(serde_json::from_str::<Quorum>("\"sometimes\"").is_err());
    }

    #[test]
    fn test_props_ignore_unknown_fields() {
        let json = r#"{"props":{"name":"_cache","n_val":3,"allow_mult":false,
            "r":"quorum","w":"quorum","dw":"quorum","rw":"quorum"}}"#;
        let envelope: PropsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.props.n_val, Some(3));
        assert_eq!(envelope.props.r, Some(Quorum::Quorum));
    }

    #[test]
    fn test_props_serialize_only_set_fields() {
        let props = BucketProps {
            n_val: Some(2),
            ..Default::default()
        };
        let json = serde_json::to_string(&PropsEnvelope { props }).unwrap();
        assert_eq!(json, r#"{"props":{"n_val":2}}"#);
    }

    #[test]
    fn test_diff_against_store_defaults() {
        let live = BucketProps {
            n_val: Some(3),
            r: Some(Quorum::Quorum),
            w: Some(Quorum::Quorum),
            dw: Some(Quorum::Quorum),
            rw: Some(Quorum::Quorum),
        };

        let diff = desired().diff(&live);
        assert_eq!(diff.n_val, Some(2));
        assert_eq!(diff.r, Some(Quorum::Count(1)));
        assert_eq!(diff.dw, Some(Quorum::Count(0)));
        assert_eq!(diff.rw, None);
    }

    #[test]
    fn test_diff_when_converged_is_empty() {
        assert!(desired().diff(&desired()).is_empty());
    }

    #[test]
    fn test_diff_when_live_is_missing_fields() {
        let diff = desired().diff(&BucketProps::default());
        assert_eq!(diff, desired());
    }

    #[test]
    fn test_merge_overlays_set_fields() {
        let mut live = BucketProps {
            n_val: Some(3),
            r: Some(Quorum::Quorum),
            ..Default::default()
        };
        live.merge(&BucketProps {
            n_val: Some(2),
            ..Default::default()
        });
        assert_eq!(live.n_val, Some(2));
        assert_eq!(live.r, Some(Quorum::Quorum));
    }
}
