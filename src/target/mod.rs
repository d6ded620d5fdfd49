//! Scrape targets and the file-based discovery format they are written in.
//!
//! The output file is a YAML sequence of `{targets: [host:port, ...], labels: {k: v}}`
//! entries, which Prometheus consumes through `file_sd_configs`.
use std::collections::BTreeMap;

mod differ;
mod error;
mod output;

pub use differ::is_different;
pub use error::{Error, Result};
pub use output::{decode, encode, load, write};

/// A set of endpoints sharing one label set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Target {
    /// `host:port` strings.
    #[serde(rename = "targets")]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Target {
    pub fn new(endpoints: Vec<String>, labels: BTreeMap<String, String>) -> Self {
        Self { endpoints, labels }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Everything one discovery cycle produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TargetSet(Vec<Target>);

impl TargetSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.0.iter()
    }

    /// A copy in the order used for comparison and for writing.
    pub fn canonical(&self) -> TargetSet {
        let mut targets = self.0.clone();
        differ::canonicalize(&mut targets);
        TargetSet(targets)
    }

    /// Number of targets per `job` label.
    pub fn count_by_job(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for target in &self.0 {
            *counts.entry(target.label("job").unwrap_or_default()).or_default() += 1;
        }
        counts
    }
}

impl From<Vec<Target>> for TargetSet {
    fn from(targets: Vec<Target>) -> Self {
        Self(targets)
    }
}

impl FromIterator<Target> for TargetSet {
    fn from_iter<I: IntoIterator<Item = Target>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Target> for TargetSet {
    fn extend<I: IntoIterator<Item = Target>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for TargetSet {
    type Item = Target;
    type IntoIter = std::vec::IntoIter<Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TargetSet {
    type Item = &'a Target;
    type IntoIter = std::slice::Iter<'a, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
