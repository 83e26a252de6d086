use serde::{Deserialize, Serialize};

use crate::models::task_assignment::AssignmentDetail;

#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    pub kw: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResourcesWeekQuery {
    pub kw: Option<String>,
    pub year: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhaseMatrixQuery {
    pub from_kw: Option<String>,
    pub to_kw: Option<String>,
    pub year: Option<String>,
    pub from_year: Option<String>,
    pub to_year: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub task_id: Option<String>,
    pub resource_id: Option<String>,
    pub date: Option<String>,
    pub half_day: Option<String>,
    pub is_fixed: Option<bool>,
    pub status_code: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignBatchRequest {
    #[serde(default)]
    pub assignments: Vec<BatchItem>,
}

#[derive(Serialize)]
pub struct BatchCreated {
    pub created: usize,
    pub assignments: Vec<AssignmentDetail>,
    pub conflicts: Vec<()>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyWeekOptions {
    pub include_assignments: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyWeekRequest {
    pub source_kw: Option<i64>,
    pub source_year: Option<i64>,
    pub target_kw: Option<i64>,
    pub target_year: Option<i64>,
    #[serde(default)]
    pub options: CopyWeekOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyWeekResult {
    pub source_kw: u32,
    pub source_year: i32,
    pub target_kw: u32,
    pub target_year: i32,
    pub copied_phase_schedules: usize,
    pub copied_assignments: usize,
}
