use std::collections::HashMap;

/// A compute instance as returned by the inventory API. Only the fields
/// discovery needs are decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default)]
    pub name: String,
    /// Full zone URI, e.g. `.../projects/p/zones/us-central1-b`.
    #[serde(default)]
    pub zone: String,
    /// Full machine type URI, e.g. `.../zones/us-central1-b/machineTypes/g1-small`.
    #[serde(default)]
    pub machine_type: String,
    #[serde(default)]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub network_interfaces: Vec<Option<NetworkInterface>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default, rename = "networkIP")]
    pub network_ip: String,
}

impl Instance {
    /// The instance's network tags, `None` if it carries no tag set at all.
    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_ref().map(|t| t.items.as_slice())
    }

    /// Address of the first present network interface.
    pub fn primary_ip(&self) -> Option<&str> {
        self.network_interfaces
            .iter()
            .flatten()
            .map(|iface| iface.network_ip.as_str())
            .next()
    }
}

/// One page of a project's instance listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstancePage {
    pub instances: Vec<Instance>,
    pub next_page_token: Option<String>,
}

/// Wire shape of `projects/{project}/aggregated/instances`.
///
/// Entries are kept as raw JSON so that a single malformed instance can be
/// skipped instead of failing the page.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AggregatedList {
    #[serde(default)]
    pub items: HashMap<String, ScopedList>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(super) struct ScopedList {
    #[serde(default)]
    pub instances: Vec<serde_json::Value>,
}

impl AggregatedList {
    /// Flattens every scope into a single page, dropping `null` and
    /// undecodable entries with a warning.
    pub fn into_page(self, project: &str) -> InstancePage {
        let mut instances = Vec::new();
        for (scope, list) in self.items {
            for raw in list.instances {
                if raw.is_null() {
                    log::warn!("skipping null instance in `{project}` ({scope})");
                    continue;
                }
                match serde_json::from_value::<Instance>(raw) {
                    Ok(instance) => instances.push(instance),
                    Err(err) => {
                        log::warn!("skipping malformed instance in `{project}` ({scope}): {err}")
                    }
                }
            }
        }

        InstancePage {
            instances,
            next_page_token: self.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}
