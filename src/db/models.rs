use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

/// Listing/booking body fields the server owns. Clients may send them but
/// they are dropped before a document is stored.
const RESERVED_FIELDS: [&str; 3] = ["_id", "id", "createdAt"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub password_hash: Option<String>,
}

impl User {
    pub fn from_new(user: NewUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            photo_url: user.photo_url,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        }
    }
}

/// A vehicle listing. Apart from the identifier and creation time the
/// listing is an open document (`vehicleName`, `category`, `pricePerDay`,
/// `location`, `description`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Vehicle {
    pub fn new(mut fields: Map<String, Value>) -> Self {
        strip_reserved(&mut fields);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            fields,
        }
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// JSON numbers, or strings holding a plain decimal such as `"39.5"`.
    /// Anything else (exponents, `NaN`, units) counts as unpriced.
    pub fn price_per_day(&self) -> Option<f64> {
        match self.fields.get("pricePerDay")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => plain_decimal(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub vehicle_id: String,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Booking payload as submitted by a client. `userEmail` is the declared
/// owner and is checked against the authenticated principal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    #[serde(default)]
    pub vehicle_id: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Booking {
    pub fn from_new(booking: NewBooking) -> Self {
        let mut details = booking.details;
        strip_reserved(&mut details);
        Self {
            id: Uuid::new_v4(),
            vehicle_id: booking.vehicle_id,
            user_email: booking.user_email,
            created_at: Utc::now(),
            details,
        }
    }
}

/// Accepts `-?[0-9]+(\.[0-9]+)?` with surrounding ASCII whitespace, the same
/// grammar the Postgres store's price expression casts.
fn plain_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim_matches(|c: char| c.is_ascii_whitespace());
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (whole, frac) = match unsigned.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (unsigned, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !frac.map_or(true, digits) {
        return None;
    }
    s.parse().ok()
}

fn strip_reserved(fields: &mut Map<String, Value>) {
    for key in RESERVED_FIELDS {
        fields.remove(key);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

/// Filter, order and window for the paginated listing search.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSearch {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: VehicleSort,
    pub page: u64,
    pub limit: u64,
}

impl VehicleSearch {
    /// Listings before the requested page. Saturates for absurd page numbers,
    /// which then simply yield an empty page.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        if let Some(category) = &self.category {
            if vehicle.text("category") != Some(category.as_str()) {
                return false;
            }
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                ["vehicleName", "description", "location"]
                    .iter()
                    .filter_map(|field| vehicle.text(field))
                    .any(|value| value.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}
