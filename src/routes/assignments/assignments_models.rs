use serde::{Deserialize, Serialize};

use crate::models::task_assignment::AssignmentDetail;
use crate::validation::double_option;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub resource_id: Option<String>,
    pub assignment_date: Option<String>,
    pub half_day: Option<String>,
    pub status_code: Option<String>,
    pub is_fixed: Option<bool>,
    pub notes: Option<String>,
    pub start_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    pub resource_id: Option<String>,
    pub assignment_date: Option<String>,
    pub half_day: Option<String>,
    pub status_code: Option<String>,
    pub is_fixed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_time: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentListQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub resource_id: Option<String>,
    pub task_id: Option<String>,
    pub status_code: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItem {
    pub task_id: Option<String>,
    pub resource_id: Option<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    pub half_day: Option<String>,
    pub is_fixed: Option<bool>,
    pub status_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAssignmentRequest {
    #[serde(default)]
    pub assignments: Vec<BulkItem>,
}

#[derive(Serialize)]
pub struct ConflictList<T: Serialize> {
    pub conflicts: Vec<T>,
}

#[derive(Serialize)]
pub struct BulkCreated {
    pub created: usize,
    pub assignments: Vec<AssignmentDetail>,
}
