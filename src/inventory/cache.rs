use std::collections::HashMap;

use super::{Instance, InstanceLister, Result, list_all_instances};

/// Instances per project, valid for a single discovery cycle.
///
/// Rules sharing a project trigger one listing; the cache is dropped with
/// the cycle so nothing is reused across cycles.
pub struct ProjectCache<'a, L: ?Sized> {
    lister: &'a L,
    projects: HashMap<String, Vec<Instance>>,
}

impl<'a, L> ProjectCache<'a, L>
where
    L: InstanceLister + ?Sized,
{
    pub fn new(lister: &'a L) -> Self {
        Self {
            lister,
            projects: HashMap::default(),
        }
    }

    /// Returns the instances of `project`, listing them on first use.
    ///
    /// # Errors
    ///
    /// Propagates the listing error; a failed project is not cached.
    pub async fn instances(&mut self, project: &str) -> Result<&[Instance]> {
        if !self.projects.contains_key(project) {
            let instances = list_all_instances(self.lister, project).await?;
            self.projects.insert(project.to_owned(), instances);
        }

        Ok(self
            .projects
            .get(project)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Number of distinct projects listed so far.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
