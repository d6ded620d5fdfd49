//! Discovery rules loaded once at startup.
//!
//! A rule file is a YAML sequence of entries like
//!
//! ```yaml
//! - job: zk
//!   tags: [zookeeper]
//!   project: sandbox
//!   ports: [8080, 6060]
//! ```
//!
//! Unknown keys are rejected and every entry must name a job, at least one
//! tag, a project and at least one port.
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use crate::fsutil;

mod error;

pub use error::{Error, Result, RuleError};

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawRule {
    job: String,
    tags: Vec<String>,
    project: String,
    ports: Vec<u16>,
}

/// A validated discovery rule.
///
/// # Examples
///
/// ```
/// # use gcesd::rules::Rule;
/// let rule = Rule::new("zk", ["zookeeper"], "sandbox", [8080, 6060]).unwrap();
/// assert_eq!(rule.job(), "zk");
/// assert_eq!(rule.ports(), &[8080, 6060]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    job: String,
    required_tags: BTreeSet<String>,
    project: String,
    ports: Vec<u16>,
}

impl Rule {
    /// Creates a rule, rejecting empty fields and port `0`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleError`] found, checked in field order.
    pub fn new(
        job: impl Into<String>,
        tags: impl IntoIterator<Item = impl Into<String>>,
        project: impl Into<String>,
        ports: impl IntoIterator<Item = u16>,
    ) -> std::result::Result<Self, RuleError> {
        let job = job.into();
        if job.is_empty() {
            return Err(RuleError::MissingJob);
        }
        let required_tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        if required_tags.is_empty() {
            return Err(RuleError::MissingTags);
        }
        let project = project.into();
        if project.is_empty() {
            return Err(RuleError::MissingProject);
        }
        let ports: Vec<u16> = ports.into_iter().collect();
        if ports.is_empty() {
            return Err(RuleError::MissingPorts);
        }
        if let Some(&port) = ports.iter().find(|&&p| p == 0) {
            return Err(RuleError::InvalidPort(port));
        }

        Ok(Self {
            job,
            required_tags,
            project,
            ports,
        })
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn required_tags(&self) -> &BTreeSet<String> {
        &self.required_tags
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Ports in configuration order.
    pub fn ports(&self) -> &[u16] {
        &self.ports
    }
}

impl TryFrom<RawRule> for Rule {
    type Error = RuleError;

    fn try_from(raw: RawRule) -> std::result::Result<Self, Self::Error> {
        Rule::new(raw.job, raw.tags, raw.project, raw.ports)
    }
}

/// The ordered, validated list of rules the daemon runs with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self(rules)
    }

    /// Loads and validates the rule file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::FileOpen`] if the file can't be opened.
    /// - [`Error::Parse`] if it isn't a YAML sequence of rule mappings, or
    ///   contains unknown keys.
    /// - [`Error::InvalidRule`] for the first entry failing validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = fsutil::open_file_reader(path)?;

        Self::from_reader(reader, path)
    }

    /// Parses a rule set from `reader`; `origin` is only used in errors.
    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self> {
        let raw: Vec<RawRule> = serde_yaml::from_reader(reader).map_err(|source| Error::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        let rules = raw
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                Rule::try_from(raw).map_err(|source| Error::InvalidRule { index, source })
            })
            .collect::<Result<Vec<_>>>()?;

        if rules.is_empty() {
            log::warn!("config `{}` contains no rules", origin.display());
        }

        Ok(Self(rules))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
