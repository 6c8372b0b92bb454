//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and, where rows are created through the API, a `Deserialize` create
//! DTO.

pub mod app;
pub mod node;
pub mod page;
pub mod query;
