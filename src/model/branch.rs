use serde::{Deserialize, Serialize};

/// Read-only branch row; only the geolocation fields matter here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Branch {
    pub id: u64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geo_radius: Option<f64>,
}
