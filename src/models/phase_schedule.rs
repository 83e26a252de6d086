use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSchedule {
    #[serde(rename = "id")]
    pub schedule_id: String,
    pub task_id: String,
    pub phase: String,
    pub planned_year: i32,
    pub planned_kw: i32,
}
