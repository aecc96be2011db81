//! Domain core for the tourbook booking platform.
//!
//! Zero internal dependencies: the query builder, aggregation pipeline model,
//! role policy, and the ports (`store`, `notify`) that adapters implement.

pub mod aggregation;
pub mod error;
pub mod geo;
pub mod hashing;
pub mod notify;
pub mod params;
pub mod query;
pub mod roles;
pub mod slug;
pub mod store;
pub mod types;
pub mod value;
