//! Typed views over stored documents.
//!
//! Each submodule contains:
//! - A `Serialize` + `Deserialize` entity struct matching the stored document
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for patches

pub mod review;
pub mod user;
