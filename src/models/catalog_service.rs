use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public attributes of a catalog service.
///
/// Returned as a point-in-time snapshot when a usage session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogService {
    pub id: Uuid,
    pub name: String,
    pub marketing_name: String,
    pub description: String,
    pub app_url: String,
    pub icon_url: Option<String>,
    pub status: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCatalogService {
    pub name: String,
    pub marketing_name: String,
    #[serde(default)]
    pub description: String,
    pub app_url: String,
    pub icon_url: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    pub version: String,
}

fn default_status() -> String {
    "active".to_string()
}
