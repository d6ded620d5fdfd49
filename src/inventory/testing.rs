//! In-memory [`InstanceLister`] for tests.
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Error, Instance, InstanceLister, InstancePage, NetworkInterface, Result, Tags};

const ZONE: &str = "https://www.googleapis.com/compute/v1/projects/sandbox/zones/us-central1-b";
const MACHINE_TYPE: &str = "https://www.googleapis.com/compute/v1/projects/sandbox/zones/us-central1-b/machineTypes/g1-small";

/// Builds an instance in `us-central1-b` with the given tags and address.
pub fn instance(name: &str, tags: &[&str], ip: Option<&str>) -> Instance {
    Instance {
        name: name.to_owned(),
        zone: ZONE.to_owned(),
        machine_type: MACHINE_TYPE.to_owned(),
        tags: Some(Tags {
            items: tags.iter().map(|t| t.to_string()).collect(),
        }),
        network_interfaces: ip
            .map(|ip| {
                vec![Some(NetworkInterface {
                    network_ip: ip.to_owned(),
                })]
            })
            .unwrap_or_default(),
    }
}

#[derive(Debug, Default)]
pub struct StaticLister {
    page_size: usize,
    delay: Option<Duration>,
    projects: Mutex<HashMap<String, Vec<Instance>>>,
    /// project -> number of pages served before failing
    failures: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl StaticLister {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Every page request sleeps for `delay` first.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_instances(&self, project: &str, instances: Vec<Instance>) {
        self.projects
            .lock()
            .unwrap()
            .insert(project.to_owned(), instances);
    }

    pub fn fail_project(&self, project: &str) {
        self.fail_after_pages(project, 0);
    }

    pub fn fail_after_pages(&self, project: &str, pages: usize) {
        self.failures
            .lock()
            .unwrap()
            .insert(project.to_owned(), pages);
    }

    pub fn recover_project(&self, project: &str) {
        self.failures.lock().unwrap().remove(project);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InstanceLister for StaticLister {
    async fn list_page(&self, project: &str, page_token: Option<&str>) -> Result<InstancePage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let page: usize = page_token.map_or(0, |t| t.parse().unwrap());
        if let Some(&limit) = self.failures.lock().unwrap().get(project) {
            if page >= limit {
                return Err(Error::Status {
                    project: project.to_owned(),
                    status: 503,
                    body: "backend unavailable".to_owned(),
                });
            }
        }

        let all = self
            .projects
            .lock()
            .unwrap()
            .get(project)
            .cloned()
            .unwrap_or_default();
        if self.page_size == 0 {
            return Ok(InstancePage {
                instances: all,
                next_page_token: None,
            });
        }

        let start = page * self.page_size;
        let end = (start + self.page_size).min(all.len());
        Ok(InstancePage {
            instances: all.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
            next_page_token: (end < all.len()).then(|| (page + 1).to_string()),
        })
    }
}
