use serde::{Deserialize, Serialize};

use crate::validation::double_option;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub order_number: Option<String>,
    pub customer_name: Option<String>,
    pub sachbearbeiter: Option<String>,
    pub installation_location: Option<String>,
    pub contact_name: Option<String>,
    pub color: Option<String>,
    pub worker_count: Option<i64>,
    pub needs_callback: Option<bool>,
    pub remarks: Option<String>,
    pub include_weekends: Option<bool>,
    pub workday_start: Option<String>,
    pub workday_end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub order_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sachbearbeiter: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub installation_location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub worker_count: Option<Option<i64>>,
    pub needs_callback: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub remarks: Option<Option<String>>,
    pub include_weekends: Option<bool>,
    pub workday_start: Option<String>,
    pub workday_end: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectShiftRequest {
    pub delta_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScheduleRequest {
    #[serde(default)]
    pub task_ids: Vec<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectShiftResult {
    pub shifted_task_ids: Vec<String>,
    pub delta_days: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScheduleResult {
    pub scheduled_task_ids: Vec<String>,
    pub skipped_task_ids: Vec<String>,
    pub warnings: Vec<String>,
}
