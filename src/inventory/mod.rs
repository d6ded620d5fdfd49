//! Instance inventory of a cloud project.
//!
//! [`InstanceLister`] is the seam to the compute API; [`GceLister`] is the
//! production implementation. [`ProjectCache`] memoizes listings per project
//! for the duration of one discovery cycle.
mod cache;
mod error;
mod gce;
mod lister;
mod models;

#[cfg(test)]
pub mod testing;

pub use cache::ProjectCache;
pub use error::{Error, Result};
pub use gce::{DEFAULT_COMPUTE_ENDPOINT, GceLister, TokenSource};
pub use lister::{InstanceLister, list_all_instances};
pub use models::{Instance, InstancePage, NetworkInterface, Tags};
