//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Reads
//! take `&PgPool`; writes that belong to a larger unit of work take an open
//! transaction so callers decide where it commits.

pub mod app_repo;
pub mod node_repo;
pub mod page_repo;
pub mod query_repo;

pub use app_repo::AppRepo;
pub use node_repo::{NodePatch, NodeRepo};
pub use page_repo::PageRepo;
pub use query_repo::QueryRepo;
