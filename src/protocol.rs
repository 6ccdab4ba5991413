//! Identifiers and measurement types shared with registries.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The tag key carrying the statistic of a [`Measurement`].
pub const STATISTIC_TAG: &str = "statistic";

/// Identifies a meter in a registry.
///
/// Two ids are equal if both the name and every tag match. Tags are kept
/// sorted so the [`Display`](fmt::Display) form is stable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeterId {
    /// The dotted metric name, e.g. `mem.heapBytesAllocated`.
    pub name: String,

    /// Dimensions attached to the metric.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl MeterId {
    /// Creates an id without tags.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Adds a tag to this id.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds multiple tags to this id.
    #[must_use]
    pub fn with_tags<T, K, V>(mut self, tags: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in tags {
            self.tags.insert(k.into(), v.into());
        }
        self
    }

    /// Returns a copy of this id tagged with the given statistic.
    #[must_use]
    pub fn with_stat(&self, stat: &str) -> Self {
        self.clone().with_tag(STATISTIC_TAG, stat)
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.tags.is_empty() {
            f.write_str("{")?;
            for (i, (k, v)) in self.tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}={}", k, v)?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}

impl From<&str> for MeterId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A single value taken from a meter when it is measured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// The meter id, tagged with the statistic this value represents.
    pub id: MeterId,

    /// The measured value.
    pub value: f64,
}

impl Measurement {
    /// Creates a new measurement.
    pub fn new(id: MeterId, value: f64) -> Self {
        Self { id, value }
    }

    /// The statistic tag of this measurement, if any.
    pub fn statistic(&self) -> Option<&str> {
        self.id.tags.get(STATISTIC_TAG).map(String::as_str)
    }
}
