pub mod auth;
pub mod reports;
pub mod resources;
pub mod reviews;
pub mod users;
