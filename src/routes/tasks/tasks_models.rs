use serde::{Deserialize, Serialize};

use crate::planning::schedule::TaskShift;
use crate::validation::double_option;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub phase: Option<String>,
    pub duration_minutes: Option<i64>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phase: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration_minutes: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseScheduleItem {
    pub phase: Option<String>,
    pub planned_year: Option<i64>,
    pub planned_kw: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PhaseSchedulesRequest {
    #[serde(default)]
    pub schedules: Vec<PhaseScheduleItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDependencyRequest {
    pub depends_on_task_id: Option<String>,
    pub dependency_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskShiftRequest {
    pub delta_days: Option<i64>,
    #[serde(default)]
    pub cascade: bool,
    /// Moves every task linked through dependencies, in both directions, by the same delta.
    #[serde(default)]
    pub shift_block: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkSlotRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_fixed: Option<bool>,
    pub is_all_day: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskShiftResult {
    pub shifted_task_ids: Vec<String>,
    pub delta_days: i64,
    pub shifted_tasks: Vec<TaskShift>,
}
