use std::sync::Arc;

use super::{Instance, InstancePage, Result};

/// A paginated, read-only listing of the instances in a project.
pub trait InstanceLister {
    /// Fetches one page. `page_token` is `None` for the first page and the
    /// previous page's `next_page_token` afterwards.
    fn list_page(
        &self,
        project: &str,
        page_token: Option<&str>,
    ) -> impl std::future::Future<Output = Result<InstancePage>> + Send;
}

impl<T> InstanceLister for Arc<T>
where
    T: InstanceLister + Send + Sync,
{
    fn list_page(
        &self,
        project: &str,
        page_token: Option<&str>,
    ) -> impl std::future::Future<Output = Result<InstancePage>> + Send {
        (**self).list_page(project, page_token)
    }
}

/// Lists every instance in `project`, following page tokens to the end.
///
/// # Errors
///
/// Returns the first page error. Instances from earlier pages are dropped.
pub async fn list_all_instances<L>(lister: &L, project: &str) -> Result<Vec<Instance>>
where
    L: InstanceLister + ?Sized,
{
    let mut instances = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = lister.list_page(project, page_token.as_deref()).await?;
        pages += 1;
        instances.extend(page.instances);
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    log::trace!(
        "listed {} instances in `{}` over {} pages",
        instances.len(),
        project,
        pages
    );
    Ok(instances)
}
