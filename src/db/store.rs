//! Store seams between the HTTP layer and the document database.
//!
//! Every method is a single query or a single atomic write. Conditional
//! inserts (`insert_user`, `insert_booking`) return `None` instead of an error
//! when the uniqueness rule rejects the document.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{Booking, NewUser, Page, User, Vehicle, VehicleSearch};
use crate::error::DatabaseError;

pub type StoreResult<T> = std::result::Result<T, DatabaseError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact, case-sensitive match on the stored email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Inserts unless a user with the same email exists.
    async fn insert_user(&self, user: NewUser) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait VehicleStore: Send + Sync {
    async fn latest_vehicles(&self, limit: u64) -> StoreResult<Vec<Vehicle>>;

    async fn find_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>>;

    async fn search_vehicles(&self, criteria: &VehicleSearch) -> StoreResult<Page<Vehicle>>;

    async fn insert_vehicle(&self, vehicle: Vehicle) -> StoreResult<Uuid>;

    /// Returns `false` when nothing was deleted.
    async fn delete_vehicle(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn bookings_for(&self, user_email: &str) -> StoreResult<Vec<Booking>>;

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Atomic check-and-insert: at most one booking per `vehicle_id`.
    async fn insert_booking(&self, booking: Booking) -> StoreResult<Option<Uuid>>;

    async fn delete_booking(&self, id: Uuid) -> StoreResult<bool>;
}
