use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{Booking, NewUser, Page, User, Vehicle, VehicleSearch, VehicleSort};
use crate::db::store::{BookingStore, CredentialStore, StoreResult, VehicleStore};
use crate::error::DatabaseError;

/// Postgres-backed document store. Listings and bookings are kept as JSONB
/// documents; the columns next to them only exist for indexing and for the
/// uniqueness rules.
#[derive(Clone)]
pub struct DbOperations {
    pool: Arc<PgPool>,
}

/// Connection counts reported by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct DbPoolStatus {
    pub total_connections: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
}

#[derive(FromRow)]
struct VehicleRow {
    id: Uuid,
    doc: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        Vehicle {
            id: row.id,
            created_at: row.created_at,
            fields: row.doc.0,
        }
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    vehicle_id: String,
    user_email: String,
    doc: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            vehicle_id: row.vehicle_id,
            user_email: row.user_email,
            created_at: row.created_at,
            details: row.doc.0,
        }
    }
}

const USER_COLUMNS: &str = "id, email, name, photo_url, password_hash, created_at";
const VEHICLE_COLUMNS: &str = "id, doc, created_at";
const BOOKING_COLUMNS: &str = "id, vehicle_id, user_email, doc, created_at";

const VEHICLE_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR doc->>'category' = $1)
      AND ($2::text IS NULL
           OR doc->>'vehicleName' ILIKE $2
           OR doc->>'description' ILIKE $2
           OR doc->>'location' ILIKE $2)
"#;

/// Numeric price, or NULL. Strings count when they hold a plain decimal,
/// matching `Vehicle::price_per_day`.
const PRICE_EXPR: &str = r#"CASE
        WHEN jsonb_typeof(doc->'pricePerDay') = 'number' THEN (doc->>'pricePerDay')::float8
        WHEN jsonb_typeof(doc->'pricePerDay') = 'string'
             AND doc->>'pricePerDay' ~ '^\s*-?[0-9]+(\.[0-9]+)?\s*$'
            THEN (doc->>'pricePerDay')::float8
    END"#;

fn order_clause(sort: VehicleSort) -> String {
    match sort {
        VehicleSort::Newest => "ORDER BY created_at DESC".to_string(),
        VehicleSort::PriceAsc => format!("ORDER BY {} ASC NULLS FIRST, created_at DESC", PRICE_EXPR),
        VehicleSort::PriceDesc => format!("ORDER BY {} DESC NULLS LAST, created_at DESC", PRICE_EXPR),
    }
}

/// Turns free text into an ILIKE substring pattern, escaping the wildcards.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl DbOperations {
    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn get_pool_status(&self) -> DbPoolStatus {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;

        DbPoolStatus {
            total_connections: size,
            active_connections: size.saturating_sub(idle),
            idle_connections: idle,
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CredentialStore for DbOperations {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<Option<User>> {
        let user = User::from_new(user);
        let inserted = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ({cols})
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            RETURNING {cols}
            "#,
            cols = USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.photo_url)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(inserted)
    }
}

#[async_trait]
impl VehicleStore for DbOperations {
    async fn latest_vehicles(&self, limit: u64) -> StoreResult<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            "SELECT {} FROM vehicles ORDER BY created_at DESC LIMIT $1",
            VEHICLE_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Vehicle::from).collect())
    }

    async fn find_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!(
            "SELECT {} FROM vehicles WHERE id = $1",
            VEHICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Vehicle::from))
    }

    async fn search_vehicles(&self, criteria: &VehicleSearch) -> StoreResult<Page<Vehicle>> {
        let pattern = criteria.search.as_deref().map(like_pattern);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM vehicles {}", VEHICLE_FILTER))
            .bind(&criteria.category)
            .bind(&pattern)
            .fetch_one(self.pool.as_ref())
            .await?;

        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            "SELECT {} FROM vehicles {} {} LIMIT $3 OFFSET $4",
            VEHICLE_COLUMNS,
            VEHICLE_FILTER,
            order_clause(criteria.sort)
        ))
        .bind(&criteria.category)
        .bind(&pattern)
        .bind(criteria.limit as i64)
        .bind(i64::try_from(criteria.skip()).unwrap_or(i64::MAX))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(Page {
            items: rows.into_iter().map(Vehicle::from).collect(),
            total: total.max(0) as u64,
        })
    }

    async fn insert_vehicle(&self, vehicle: Vehicle) -> StoreResult<Uuid> {
        let Vehicle { id, created_at, fields } = vehicle;
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO vehicles (id, doc, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(id)
        .bind(Json(fields))
        .bind(created_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(id)
    }

    async fn delete_vehicle(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BookingStore for DbOperations {
    async fn bookings_for(&self, user_email: &str) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_email = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_email)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Booking::from))
    }

    async fn insert_booking(&self, booking: Booking) -> StoreResult<Option<Uuid>> {
        let Booking { id, vehicle_id, user_email, created_at, details } = booking;
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO bookings (id, vehicle_id, user_email, doc, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (vehicle_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(vehicle_id)
        .bind(user_email)
        .bind(Json(details))
        .bind(created_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(id)
    }

    async fn delete_booking(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
