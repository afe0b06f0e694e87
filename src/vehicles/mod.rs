//! Vehicle listings: public reads and search, gated create/delete.

pub mod handlers;
pub mod query;

pub use query::VehicleQuery;
