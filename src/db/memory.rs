use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{Booking, NewUser, Page, User, Vehicle, VehicleSearch, VehicleSort};
use crate::db::store::{BookingStore, CredentialStore, StoreResult, VehicleStore};

/// In-process store used for tests and `database.url = "memory://"`.
///
/// Each conditional insert holds the write lock across its existence check,
/// which gives it the same atomicity as the unique indexes in Postgres.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    vehicles: RwLock<HashMap<Uuid, Vehicle>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(a: &Vehicle, b: &Vehicle) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

fn by_price(a: &Vehicle, b: &Vehicle) -> Ordering {
    // Listings without a price sort before priced ones.
    match (a.price_per_day(), b.price_per_day()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(sort: VehicleSort, a: &Vehicle, b: &Vehicle) -> Ordering {
    match sort {
        VehicleSort::Newest => newest_first(a, b),
        VehicleSort::PriceAsc => by_price(a, b).then_with(|| newest_first(a, b)),
        VehicleSort::PriceDesc => by_price(b, a).then_with(|| newest_first(a, b)),
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Ok(None);
        }
        let user = User::from_new(user);
        users.insert(user.email.clone(), user.clone());
        Ok(Some(user))
    }
}

#[async_trait]
impl VehicleStore for MemoryStore {
    async fn latest_vehicles(&self, limit: u64) -> StoreResult<Vec<Vehicle>> {
        let vehicles = self.vehicles.read().await;
        let mut all: Vec<Vehicle> = vehicles.values().cloned().collect();
        all.sort_by(newest_first);
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn find_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>> {
        Ok(self.vehicles.read().await.get(&id).cloned())
    }

    async fn search_vehicles(&self, criteria: &VehicleSearch) -> StoreResult<Page<Vehicle>> {
        let vehicles = self.vehicles.read().await;
        let mut matching: Vec<Vehicle> = vehicles
            .values()
            .filter(|v| criteria.matches(v))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare(criteria.sort, a, b));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(criteria.skip()).unwrap_or(usize::MAX))
            .take(criteria.limit as usize)
            .collect();

        Ok(Page { items, total })
    }

    async fn insert_vehicle(&self, vehicle: Vehicle) -> StoreResult<Uuid> {
        let id = vehicle.id;
        self.vehicles.write().await.insert(id, vehicle);
        Ok(id)
    }

    async fn delete_vehicle(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.vehicles.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn bookings_for(&self, user_email: &str) -> StoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut owned: Vec<Booking> = bookings
            .values()
            .filter(|b| b.user_email == user_email)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn insert_booking(&self, booking: Booking) -> StoreResult<Option<Uuid>> {
        let mut bookings = self.bookings.write().await;
        if bookings.values().any(|b| b.vehicle_id == booking.vehicle_id) {
            return Ok(None);
        }
        let id = booking.id;
        bookings.insert(id, booking);
        Ok(Some(id))
    }

    async fn delete_booking(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.bookings.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn vehicle(doc: Value, age_minutes: i64) -> Vehicle {
        let mut v = Vehicle::new(doc.as_object().cloned().unwrap());
        v.created_at = Utc::now() - Duration::minutes(age_minutes);
        v
    }

    fn booking(vehicle_id: &str, email: &str) -> Booking {
        Booking::from_new(
            serde_json::from_value(json!({"vehicleId": vehicle_id, "userEmail": email})).unwrap(),
        )
    }

    fn search(sort: VehicleSort, page: u64, limit: u64) -> VehicleSearch {
        VehicleSearch { search: None, category: None, sort, page, limit }
    }

    #[tokio::test]
    async fn test_insert_user_is_unique_by_email() {
        let store = MemoryStore::new();
        let new_user = || NewUser {
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
            photo_url: None,
            password_hash: None,
        };

        assert!(store.insert_user(new_user()).await.unwrap().is_some());
        assert!(store.insert_user(new_user()).await.unwrap().is_none());

        assert!(store.find_by_email("alice@example.com").await.unwrap().is_some());
        // Lookups are exact: no case folding.
        assert!(store.find_by_email("Alice@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_vehicles_newest_first() {
        let store = MemoryStore::new();
        for age in 0..8 {
            store
                .insert_vehicle(vehicle(json!({"vehicleName": format!("car-{}", age)}), age))
                .await
                .unwrap();
        }

        let latest = store.latest_vehicles(6).await.unwrap();
        assert_eq!(latest.len(), 6);
        assert_eq!(latest[0].text("vehicleName"), Some("car-0"));
        assert_eq!(latest[5].text("vehicleName"), Some("car-5"));
    }

    #[tokio::test]
    async fn test_search_sorts_and_paginates() {
        let store = MemoryStore::new();
        store.insert_vehicle(vehicle(json!({"vehicleName": "a", "pricePerDay": 30}), 3)).await.unwrap();
        store.insert_vehicle(vehicle(json!({"vehicleName": "b", "pricePerDay": 10}), 2)).await.unwrap();
        store.insert_vehicle(vehicle(json!({"vehicleName": "c", "pricePerDay": 20}), 1)).await.unwrap();

        let page = store.search_vehicles(&search(VehicleSort::PriceAsc, 1, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.items.iter().filter_map(|v| v.text("vehicleName")).collect();
        assert_eq!(names, vec!["b", "c"]);

        let page = store.search_vehicles(&search(VehicleSort::PriceAsc, 2, 2)).await.unwrap();
        let names: Vec<_> = page.items.iter().filter_map(|v| v.text("vehicleName")).collect();
        assert_eq!(names, vec!["a"]);

        let page = store.search_vehicles(&search(VehicleSort::PriceDesc, 1, 9)).await.unwrap();
        let names: Vec<_> = page.items.iter().filter_map(|v| v.text("vehicleName")).collect();
        assert_eq!(names, vec!["a", "c", "b"]);

        let page = store.search_vehicles(&search(VehicleSort::Newest, 1, 9)).await.unwrap();
        let names: Vec<_> = page.items.iter().filter_map(|v| v.text("vehicleName")).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_string_prices_sort_with_numeric_ones() {
        let store = MemoryStore::new();
        store.insert_vehicle(vehicle(json!({"vehicleName": "a", "pricePerDay": 45}), 3)).await.unwrap();
        store.insert_vehicle(vehicle(json!({"vehicleName": "b", "pricePerDay": "39.5"}), 2)).await.unwrap();
        store.insert_vehicle(vehicle(json!({"vehicleName": "c", "pricePerDay": 30}), 1)).await.unwrap();
        store.insert_vehicle(vehicle(json!({"vehicleName": "d", "pricePerDay": "call us"}), 0)).await.unwrap();

        let page = store.search_vehicles(&search(VehicleSort::PriceAsc, 1, 9)).await.unwrap();
        let names: Vec<_> = page.items.iter().filter_map(|v| v.text("vehicleName")).collect();
        assert_eq!(names, vec!["d", "c", "b", "a"]);

        let page = store.search_vehicles(&search(VehicleSort::PriceDesc, 1, 9)).await.unwrap();
        let names: Vec<_> = page.items.iter().filter_map(|v| v.text("vehicleName")).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_booking_guard_is_per_vehicle() {
        let store = MemoryStore::new();

        assert!(store.insert_booking(booking("v1", "alice@example.com")).await.unwrap().is_some());
        assert!(store.insert_booking(booking("v1", "alice@example.com")).await.unwrap().is_none());
        assert!(store.insert_booking(booking("v1", "bob@example.com")).await.unwrap().is_none());
        assert!(store.insert_booking(booking("v2", "bob@example.com")).await.unwrap().is_some());

        let alice = store.bookings_for("alice@example.com").await.unwrap();
        assert_eq!(alice.len(), 1);
        assert!(alice.iter().all(|b| b.user_email == "alice@example.com"));
    }

    #[tokio::test]
    async fn test_concurrent_bookings_admit_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert_booking(booking("contested", &format!("user{}@example.com", i)))
                    .await
                    .unwrap()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn test_delete_reports_missing_documents() {
        let store = MemoryStore::new();
        let id = store.insert_vehicle(vehicle(json!({}), 0)).await.unwrap();

        assert!(store.delete_vehicle(id).await.unwrap());
        assert!(!store.delete_vehicle(id).await.unwrap());
        assert!(!store.delete_booking(Uuid::new_v4()).await.unwrap());
    }
}
