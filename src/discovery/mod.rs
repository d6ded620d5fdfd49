//! One pass of fetch, filter and map over every rule.
mod filter;
mod mapper;

pub use filter::matches;
pub use mapper::{
    JOB_LABEL, MACHINE_TYPE_LABEL, MappingError, NAME_LABEL, PROJECT_LABEL, TAG_LABEL_PREFIX,
    ZONE_LABEL, map,
};

use crate::error::ResultOkLogExt;
use crate::inventory::{self, InstanceLister, ProjectCache};
use crate::rules::RuleSet;
use crate::target::TargetSet;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to list instances in `{project}` for job `{job}`: {source}")]
    Fetch {
        project: String,
        job: String,
        #[source]
        source: inventory::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a discovery pass produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub targets: TargetSet,
    /// Matching instances dropped because they could not be mapped.
    pub skipped_instances: usize,
}

/// Runs every rule against the inventory of its project.
///
/// Each project is listed once no matter how many rules name it. Instances
/// that match but cannot be mapped are logged and left out.
///
/// # Errors
///
/// Returns [`Error::Fetch`] as soon as any project listing fails; nothing
/// discovered so far is returned.
pub async fn discover_targets<L>(lister: &L, rules: &RuleSet) -> Result<Discovery>
where
    L: InstanceLister + ?Sized,
{
    let mut cache = ProjectCache::new(lister);
    let mut discovery = Discovery::default();

    for rule in rules {
        let instances = cache
            .instances(rule.project())
            .await
            .map_err(|source| Error::Fetch {
                project: rule.project().to_owned(),
                job: rule.job().to_owned(),
                source,
            })?;

        let before = discovery.targets.len();
        let mut matched = 0usize;
        for instance in instances
            .iter()
            .filter(|instance| matches(instance, rule.required_tags()))
        {
            matched += 1;
            match map(instance, rule).ok_log_at(log::Level::Warn) {
                Some(target) => discovery.targets.extend([target]),
                None => discovery.skipped_instances += 1,
            }
        }

        log::debug!(
            "job `{}`: {} of {} instances in `{}` match {:?}, {} targets",
            rule.job(),
            matched,
            instances.len(),
            rule.project(),
            rule.required_tags(),
            discovery.targets.len() - before,
        );
    }

    Ok(discovery)
}
