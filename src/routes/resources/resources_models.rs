use serde::{Deserialize, Serialize};

use crate::models::resource::Resource;
use crate::validation::double_option;

// List filters
#[derive(Debug, Deserialize)]
pub struct ResourceListQuery {
    pub department: Option<String>,
    pub employee_type: Option<String>,
    pub is_active: Option<String>,
    pub resource_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailableQuery {
    pub date: Option<String>,
    pub half_day: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    pub name: Option<String>,
    pub resource_type: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub availability_enabled: Option<bool>,
    pub department: Option<String>,
    pub employee_type: Option<String>,
    pub short_code: Option<String>,
    pub default_location: Option<String>,
    pub weekly_hours: Option<f64>,
    pub skills: Option<Vec<String>>,
}

/// Absent fields stay untouched; an explicit `null` clears a nullable column.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourceRequest {
    pub name: Option<String>,
    pub resource_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub availability_enabled: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub employee_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub short_code: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub default_location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub weekly_hours: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub skills: Option<Option<Vec<String>>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableResources {
    pub date: chrono::NaiveDate,
    pub half_day: String,
    pub resources: Vec<Resource>,
}
