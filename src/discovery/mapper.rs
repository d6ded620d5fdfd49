use std::collections::BTreeMap;

use crate::inventory::Instance;
use crate::rules::Rule;
use crate::target::Target;

pub const JOB_LABEL: &str = "job";
pub const ZONE_LABEL: &str = "gce_instance_zone";
pub const MACHINE_TYPE_LABEL: &str = "gce_instance_type";
pub const PROJECT_LABEL: &str = "gce_instance_project";
pub const NAME_LABEL: &str = "gce_instance_name";
pub const TAG_LABEL_PREFIX: &str = "gce_instance_tag_";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("instance `{instance}` has no network interface")]
    NoInterface { instance: String },
}

/// Turns a matching instance into a target scraped on every port of `rule`.
///
/// Each instance tag becomes its own `gce_instance_tag_<tag>="true"` label.
///
/// # Errors
///
/// Returns [`MappingError::NoInterface`] if the instance has no present
/// network interface to take an address from.
pub fn map(instance: &Instance, rule: &Rule) -> Result<Target, MappingError> {
    let ip = instance
        .primary_ip()
        .ok_or_else(|| MappingError::NoInterface {
            instance: instance.name.clone(),
        })?;

    let endpoints = rule
        .ports()
        .iter()
        .map(|port| format!("{ip}:{port}"))
        .collect();

    let mut labels = BTreeMap::from([
        (JOB_LABEL.to_owned(), rule.job().to_owned()),
        (PROJECT_LABEL.to_owned(), rule.project().to_owned()),
        (ZONE_LABEL.to_owned(), last_segment(&instance.zone).to_owned()),
        (
            MACHINE_TYPE_LABEL.to_owned(),
            last_segment(&instance.machine_type).to_owned(),
        ),
        (NAME_LABEL.to_owned(), instance.name.clone()),
    ]);
    for tag in instance.tags().unwrap_or_default() {
        labels.insert(
            format!("{TAG_LABEL_PREFIX}{}", format_tag(tag)),
            "true".to_owned(),
        );
    }

    Ok(Target::new(endpoints, labels))
}

/// `.../zones/us-central1-b` -> `us-central1-b`
fn last_segment(resource: &str) -> &str {
    resource.rsplit('/').next().unwrap_or(resource)
}

/// Lower-cases and replaces `-` with `_`, so the tag is usable in a label name.
fn format_tag(tag: &str) -> String {
    tag.to_lowercase().replace('-', "_")
}
