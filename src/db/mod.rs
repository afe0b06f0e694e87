//! Database module for the TravelEase server
//!
//! Document models, the store traits the handlers depend on, and the two
//! store implementations (Postgres and in-memory).

pub mod memory;
pub mod models;
pub mod operations;
pub mod store;

pub use memory::MemoryStore;
pub use models::{Booking, NewBooking, NewUser, Page, User, Vehicle, VehicleSearch, VehicleSort};
pub use operations::DbOperations;
pub use store::{BookingStore, CredentialStore, StoreResult, VehicleStore};
