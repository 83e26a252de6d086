use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::calendar::{day_name, effective_weekly_hours, percent, round1};
use crate::models::enums::{Choice, Department, HalfDay};
use crate::models::phase_schedule::PhaseSchedule;
use crate::models::resource::Resource;
use crate::models::task::{BoardTask, ScheduledTask};
use crate::models::task_assignment::AssignmentDetail;

/// Hours credited per filled half-day slot on the board (42.5 h / 5 days / 2 halves).
pub const HALF_SLOT_HOURS: f64 = 4.25;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseWeek {
    pub phase: Department,
    pub planned_kw: Option<i32>,
    pub planned_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDetail {
    pub assignment_id: String,
    pub resource_id: String,
    pub resource_name: String,
    pub half_day: String,
    pub is_fixed: bool,
    pub notes: Option<String>,
    pub status_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAssignment {
    pub date: NaiveDate,
    pub day_name: &'static str,
    pub morning: Option<String>,
    pub afternoon: Option<String>,
    pub morning_status_code: Option<String>,
    pub afternoon_status_code: Option<String>,
    pub morning_detail: Option<SlotDetail>,
    pub afternoon_detail: Option<SlotDetail>,
    pub is_fixed: bool,
    pub notes: Option<String>,
}

impl DayAssignment {
    fn filled_halves(&self) -> usize {
        usize::from(self.morning.is_some()) + usize::from(self.afternoon.is_some())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekPlanTask {
    pub task_id: String,
    pub project_id: String,
    pub project_order_number: String,
    pub sachbearbeiter: String,
    pub customer_name: String,
    pub description: String,
    pub installation_location: String,
    pub phases: Vec<PhaseWeek>,
    pub worker_count: i32,
    pub color: String,
    pub contact_name: String,
    pub needs_callback: bool,
    pub assignments: Vec<DayAssignment>,
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekPlanResource {
    pub id: String,
    pub name: String,
    pub short_code: Option<String>,
    pub department: Option<String>,
    pub employee_type: Option<String>,
    pub weekly_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionHours {
    pub planned: f64,
    pub available: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub department: Department,
    pub label: &'static str,
    pub tasks: Vec<WeekPlanTask>,
    pub resources: Vec<WeekPlanResource>,
    pub total_hours: SectionHours,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub department: Department,
    pub label: &'static str,
    pub available_hours: f64,
    pub planned_hours: f64,
    pub utilization_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySummary {
    pub total_available_hours: f64,
    pub total_planned_hours: f64,
    pub utilization_percent: f64,
    pub by_department: Vec<DepartmentSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekPlan {
    pub kw: u32,
    pub year: i32,
    pub date_range: DateRange,
    pub sections: Vec<Section>,
    pub capacity_summary: CapacitySummary,
}

/// Everything the board query loaded for one week.
pub struct WeekPlanInput<'a> {
    pub kw: u32,
    pub year: i32,
    pub dates: [NaiveDate; 5],
    pub tasks: &'a [BoardTask],
    pub schedules: &'a [PhaseSchedule],
    pub assignments: &'a [AssignmentDetail],
    pub resources: &'a [Resource],
}

fn non_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn sorted_schedules<'a>(schedules: &[&'a PhaseSchedule]) -> Vec<(Department, &'a PhaseSchedule)> {
    let mut known: Vec<(Department, &PhaseSchedule)> = schedules
        .iter()
        .filter_map(|s| s.phase.parse::<Department>().ok().map(|phase| (phase, *s)))
        .collect();
    known.sort_by_key(|(phase, s)| (phase.phase_rank(), s.planned_year, s.planned_kw));
    known
}

/// The board section of a task: the first phase (in production order) planned
/// for this week, production otherwise.
pub fn task_department(kw: u32, year: i32, schedules: &[&PhaseSchedule]) -> Department {
    sorted_schedules(schedules)
        .into_iter()
        .find(|(_, s)| s.planned_year == year && s.planned_kw == kw as i32)
        .map(|(phase, _)| phase)
        .unwrap_or(Department::Produktion)
}

/// One entry per production phase; a phase with several schedules shows the earliest.
pub fn phase_weeks(schedules: &[&PhaseSchedule]) -> Vec<PhaseWeek> {
    let sorted = sorted_schedules(schedules);
    Department::PHASES
        .iter()
        .map(|phase| {
            let first = sorted.iter().find(|(p, _)| p == phase).map(|(_, s)| *s);
            PhaseWeek {
                phase: *phase,
                planned_kw: first.map(|s| s.planned_kw),
                planned_year: first.map(|s| s.planned_year),
            }
        })
        .collect()
}

fn slot_detail(a: &AssignmentDetail) -> SlotDetail {
    SlotDetail {
        assignment_id: a.assignment_id.clone(),
        resource_id: a.resource_id.clone(),
        resource_name: a.resource_name.clone(),
        half_day: a.half_day.clone(),
        is_fixed: a.is_fixed,
        notes: a.notes.clone(),
        status_code: a.status_code.clone(),
    }
}

/// Morning and afternoon cells of one task for each day of the week.
pub fn day_assignments(dates: &[NaiveDate], assignments: &[&AssignmentDetail]) -> Vec<DayAssignment> {
    dates
        .iter()
        .map(|date| {
            let day: Vec<&AssignmentDetail> = assignments
                .iter()
                .copied()
                .filter(|a| a.assignment_date == *date)
                .collect();
            let covering = |want: fn(&HalfDay) -> bool| {
                day.iter()
                    .copied()
                    .find(|a| a.half_day.parse::<HalfDay>().map(|h| want(&h)).unwrap_or(false))
            };
            let morning = covering(HalfDay::covers_morning);
            let afternoon = covering(HalfDay::covers_afternoon);

            let notes: Vec<&str> = day
                .iter()
                .filter_map(|a| a.notes.as_deref())
                .filter(|n| !n.is_empty())
                .collect();

            DayAssignment {
                date: *date,
                day_name: day_name(*date),
                morning: morning.map(|a| a.resource_display().to_string()),
                afternoon: afternoon.map(|a| a.resource_display().to_string()),
                morning_status_code: morning.map(|a| a.status_code.clone()),
                afternoon_status_code: afternoon.map(|a| a.status_code.clone()),
                morning_detail: morning.map(slot_detail),
                afternoon_detail: afternoon.map(slot_detail),
                is_fixed: day.iter().any(|a| a.is_fixed),
                notes: if notes.is_empty() { None } else { Some(notes.join("; ")) },
            }
        })
        .collect()
}

pub fn compose_week_plan(input: WeekPlanInput<'_>) -> WeekPlan {
    let WeekPlanInput {
        kw,
        year,
        dates,
        tasks,
        schedules,
        assignments,
        resources,
    } = input;

    let mut schedules_by_task: HashMap<&str, Vec<&PhaseSchedule>> = HashMap::new();
    for s in schedules {
        schedules_by_task.entry(s.task_id.as_str()).or_default().push(s);
    }
    let mut assignments_by_task: HashMap<&str, Vec<&AssignmentDetail>> = HashMap::new();
    for a in assignments {
        assignments_by_task.entry(a.task_id.as_str()).or_default().push(a);
    }

    let mut tasks_by_dept: HashMap<Department, Vec<WeekPlanTask>> = HashMap::new();
    for task in tasks {
        let task_schedules = schedules_by_task
            .get(task.task_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let task_assignments = assignments_by_task
            .get(task.task_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let dept = task_department(kw, year, task_schedules);
        tasks_by_dept.entry(dept).or_default().push(WeekPlanTask {
            task_id: task.task_id.clone(),
            project_id: task.project_id.clone(),
            project_order_number: non_empty(&task.order_number),
            sachbearbeiter: non_empty(&task.sachbearbeiter),
            customer_name: non_empty(&task.customer_name),
            description: task.task_title.clone(),
            installation_location: non_empty(&task.installation_location),
            phases: phase_weeks(task_schedules),
            worker_count: task.worker_count.unwrap_or(0),
            color: non_empty(&task.color),
            contact_name: non_empty(&task.contact_name),
            needs_callback: task.needs_callback,
            assignments: day_assignments(&dates, task_assignments),
            remarks: non_empty(&task.remarks),
        });
    }

    let mut resources_by_dept: HashMap<&str, Vec<WeekPlanResource>> = HashMap::new();
    for r in resources {
        let key = r.department.as_deref().unwrap_or("unassigned");
        resources_by_dept.entry(key).or_default().push(WeekPlanResource {
            id: r.resource_id.clone(),
            name: r.name.clone(),
            short_code: r.short_code.clone(),
            department: r.department.clone(),
            employee_type: r.employee_type.clone(),
            weekly_hours: effective_weekly_hours(r.weekly_hours),
        });
    }

    let sections: Vec<Section> = Department::ALL
        .iter()
        .map(|dept| {
            let tasks = tasks_by_dept.remove(dept).unwrap_or_default();
            let resources = resources_by_dept.remove(dept.as_str()).unwrap_or_default();
            let half_slots: usize = tasks
                .iter()
                .flat_map(|t| t.assignments.iter())
                .map(DayAssignment::filled_halves)
                .sum();
            let available: f64 = resources.iter().map(|r| r.weekly_hours).sum();

            Section {
                department: *dept,
                label: dept.label(),
                tasks,
                resources,
                total_hours: SectionHours {
                    planned: round1(half_slots as f64 * HALF_SLOT_HOURS),
                    available: round1(available),
                },
            }
        })
        .collect();

    let total_available: f64 = sections.iter().map(|s| s.total_hours.available).sum();
    let total_planned: f64 = sections.iter().map(|s| s.total_hours.planned).sum();

    let capacity_summary = CapacitySummary {
        total_available_hours: round1(total_available),
        total_planned_hours: round1(total_planned),
        utilization_percent: percent(total_planned, total_available),
        by_department: sections
            .iter()
            .map(|s| DepartmentSummary {
                department: s.department,
                label: s.label,
                available_hours: s.total_hours.available,
                planned_hours: s.total_hours.planned,
                utilization_percent: percent(s.total_hours.planned, s.total_hours.available),
            })
            .collect(),
    };

    WeekPlan {
        kw,
        year,
        date_range: DateRange {
            from: dates[0],
            to: dates[4],
        },
        sections,
        capacity_summary,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedTask {
    pub task_id: String,
    pub project_order_number: String,
    pub customer_name: String,
    pub description: String,
    pub installation_location: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedDepartment {
    pub department: Department,
    pub label: &'static str,
    pub tasks: Vec<UnassignedTask>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedTasks {
    pub kw: u32,
    pub year: i32,
    pub total_unassigned: usize,
    pub departments: Vec<UnassignedDepartment>,
}

/// Groups tasks scheduled this week without any booking by the phase they are
/// scheduled for. A task with several phases this week is listed once, under
/// its earliest phase.
pub fn group_unassigned(kw: u32, year: i32, rows: &[ScheduledTask]) -> UnassignedTasks {
    let mut first_phase: Vec<(&ScheduledTask, Department)> = Vec::new();
    for row in rows {
        let phase = match row.phase.parse::<Department>() {
            Ok(phase) => phase,
            Err(_) => continue,
        };
        match first_phase.iter_mut().find(|(t, _)| t.task_id == row.task_id) {
            Some(entry) if phase.phase_rank() < entry.1.phase_rank() => entry.1 = phase,
            Some(_) => {}
            None => first_phase.push((row, phase)),
        }
    }

    let departments: Vec<UnassignedDepartment> = Department::ALL
        .iter()
        .filter_map(|dept| {
            let tasks: Vec<UnassignedTask> = first_phase
                .iter()
                .filter(|(_, phase)| phase == dept)
                .map(|(row, _)| UnassignedTask {
                    task_id: row.task_id.clone(),
                    project_order_number: non_empty(&row.order_number),
                    customer_name: non_empty(&row.customer_name),
                    description: row.task_title.clone(),
                    installation_location: non_empty(&row.installation_location),
                })
                .collect();
            (!tasks.is_empty()).then(|| UnassignedDepartment {
                department: *dept,
                label: dept.label(),
                tasks,
            })
        })
        .collect();

    UnassignedTasks {
        kw,
        year,
        total_unassigned: departments.iter().map(|d| d.tasks.len()).sum(),
        departments,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixWeek {
    pub kw: u32,
    pub year: i32,
    pub phases: Vec<Department>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixTask {
    pub task_id: String,
    pub project_order_number: String,
    pub customer_name: String,
    pub description: String,
    pub weeks: Vec<MatrixWeek>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseMatrix {
    pub from_kw: u32,
    pub to_kw: u32,
    pub year: i32,
    pub kw_range: Vec<u32>,
    pub tasks: Vec<MatrixTask>,
}

/// Phases planned per task and week over `weeks` (consecutive (year, kw) pairs).
/// Tasks keep the order of `rows`.
pub fn build_phase_matrix(weeks: &[(i32, u32)], rows: &[ScheduledTask]) -> PhaseMatrix {
    let mut tasks: Vec<MatrixTask> = Vec::new();
    for row in rows {
        let phase = match row.phase.parse::<Department>() {
            Ok(phase) => phase,
            Err(_) => continue,
        };
        let index = match tasks.iter().position(|t| t.task_id == row.task_id) {
            Some(index) => index,
            None => {
                tasks.push(MatrixTask {
                    task_id: row.task_id.clone(),
                    project_order_number: non_empty(&row.order_number),
                    customer_name: non_empty(&row.customer_name),
                    description: row.task_title.clone(),
                    weeks: weeks
                        .iter()
                        .map(|(year, kw)| MatrixWeek {
                            kw: *kw,
                            year: *year,
                            phases: Vec::new(),
                        })
                        .collect(),
                });
                tasks.len() - 1
            }
        };
        if let Some(week) = tasks[index]
            .weeks
            .iter_mut()
            .find(|w| w.year == row.planned_year && w.kw as i32 == row.planned_kw)
        {
            if !week.phases.contains(&phase) {
                week.phases.push(phase);
                week.phases.sort_by_key(Department::phase_rank);
            }
        }
    }

    let (first_year, from_kw) = weeks.first().copied().unwrap_or((0, 0));
    let to_kw = weeks.last().map(|(_, kw)| *kw).unwrap_or(0);

    PhaseMatrix {
        from_kw,
        to_kw,
        year: first_year,
        kw_range: weeks.iter().map(|(_, kw)| *kw).collect(),
        tasks,
    }
}
