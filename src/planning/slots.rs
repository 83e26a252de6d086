use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::calendar::{daily_hours, day_name, effective_weekly_hours, percent, round2, week_dates};
use super::week_plan::DateRange;
use crate::models::enums::{HalfDay, StatusCode};
use crate::models::resource::Resource;
use crate::models::task_assignment::{AssignmentDetail, NewAssignment};

fn half_of(a: &AssignmentDetail) -> Option<HalfDay> {
    a.half_day.parse::<HalfDay>().ok()
}

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictAssignment {
    pub assignment_id: String,
    pub task_id: String,
    pub project_order_number: String,
    pub customer_name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekConflict {
    pub resource_id: String,
    pub resource_name: String,
    pub short_code: String,
    pub date: NaiveDate,
    pub half_day: HalfDay,
    pub assignments: Vec<ConflictAssignment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekConflicts {
    pub kw: u32,
    pub year: i32,
    pub conflicts: Vec<WeekConflict>,
}

/// Every (resource, date, half) occupied by more than one live assignment.
/// A full day occupies both halves, so it collides with either.
pub fn find_week_conflicts(kw: u32, year: i32, assignments: &[AssignmentDetail]) -> WeekConflicts {
    let mut slots: BTreeMap<(&str, &str, NaiveDate, bool), Vec<&AssignmentDetail>> = BTreeMap::new();
    for a in assignments {
        let half = match half_of(a) {
            Some(half) => half,
            None => continue,
        };
        for h in half.halves() {
            let afternoon = *h == HalfDay::Afternoon;
            slots
                .entry((a.resource_name.as_str(), a.resource_id.as_str(), a.assignment_date, afternoon))
                .or_default()
                .push(a);
        }
    }

    let conflicts = slots
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|((_, _, date, afternoon), rows)| {
            let first = rows[0];
            WeekConflict {
                resource_id: first.resource_id.clone(),
                resource_name: first.resource_name.clone(),
                short_code: or_empty(&first.resource_short_code),
                date,
                half_day: if afternoon { HalfDay::Afternoon } else { HalfDay::Morning },
                assignments: rows
                    .iter()
                    .map(|a| ConflictAssignment {
                        assignment_id: a.assignment_id.clone(),
                        task_id: a.task_id.clone(),
                        project_order_number: or_empty(&a.project_order_number),
                        customer_name: or_empty(&a.customer_name),
                        description: a.task_title.clone(),
                    })
                    .collect(),
            }
        })
        .collect();

    WeekConflicts { kw, year, conflicts }
}

/// Live assignments of `resource_id` on `date` that share a half with `half_day`.
pub fn slot_conflicts<'a>(
    resource_id: &str,
    date: NaiveDate,
    half_day: HalfDay,
    existing: &'a [AssignmentDetail],
    exclude_id: Option<&str>,
) -> Vec<&'a AssignmentDetail> {
    existing
        .iter()
        .filter(|a| a.resource_id == resource_id && a.assignment_date == date)
        .filter(|a| Some(a.assignment_id.as_str()) != exclude_id)
        .filter(|a| half_of(a).map(|h| h.overlaps(half_day)).unwrap_or(false))
        .collect()
}

/// One requested booking of a batch.
#[derive(Debug, Clone)]
pub struct SlotRequest {
    pub task_id: String,
    pub resource_id: String,
    pub date: NaiveDate,
    pub half_day: HalfDay,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConflict {
    pub index: usize,
    pub task_id: String,
    pub resource_id: String,
    pub date: NaiveDate,
    pub half_day: HalfDay,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_assignment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_index: Option<usize>,
}

/// Checks a batch against the stored assignments and against itself.
pub fn find_batch_conflicts(requests: &[SlotRequest], existing: &[AssignmentDetail]) -> Vec<BatchConflict> {
    let mut conflicts = Vec::new();

    for (index, req) in requests.iter().enumerate() {
        for hit in slot_conflicts(&req.resource_id, req.date, req.half_day, existing, None) {
            conflicts.push(BatchConflict {
                index,
                task_id: req.task_id.clone(),
                resource_id: req.resource_id.clone(),
                date: req.date,
                half_day: req.half_day,
                existing_assignment_id: Some(hit.assignment_id.clone()),
                existing_task_id: Some(hit.task_id.clone()),
                conflicting_index: None,
            });
        }

        for (earlier, other) in requests[..index].iter().enumerate() {
            if other.resource_id == req.resource_id
                && other.date == req.date
                && other.half_day.overlaps(req.half_day)
            {
                conflicts.push(BatchConflict {
                    index,
                    task_id: req.task_id.clone(),
                    resource_id: req.resource_id.clone(),
                    date: req.date,
                    half_day: req.half_day,
                    existing_assignment_id: None,
                    existing_task_id: None,
                    conflicting_index: Some(earlier),
                });
            }
        }
    }

    conflicts
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResource {
    pub id: String,
    pub name: String,
    pub short_code: Option<String>,
    pub department: Option<String>,
    pub employee_type: Option<String>,
    pub weekly_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub assignment_id: String,
    pub task_id: String,
    pub project_order_number: String,
    pub customer_name: String,
    pub description: String,
    pub installation_location: String,
    pub is_fixed: bool,
    pub notes: Option<String>,
    pub status_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    pub date: NaiveDate,
    pub day_name: &'static str,
    pub morning: Option<ScheduleSlot>,
    pub afternoon: Option<ScheduleSlot>,
    pub assigned_hours: f64,
    pub available_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    pub total_assigned: f64,
    pub total_available: f64,
    pub utilization_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchedule {
    pub resource: ScheduleResource,
    pub kw: u32,
    pub year: i32,
    pub date_range: DateRange,
    pub days: Vec<ScheduleDay>,
    pub week_summary: WeekSummary,
}

fn schedule_slot(a: &AssignmentDetail) -> ScheduleSlot {
    ScheduleSlot {
        assignment_id: a.assignment_id.clone(),
        task_id: a.task_id.clone(),
        project_order_number: or_empty(&a.project_order_number),
        customer_name: or_empty(&a.customer_name),
        description: a.task_title.clone(),
        installation_location: or_empty(&a.installation_location),
        is_fixed: a.is_fixed,
        notes: a.notes.clone(),
        status_code: a.status_code.clone(),
    }
}

fn covering<'a>(day: &[&'a AssignmentDetail], afternoon: bool) -> Option<&'a AssignmentDetail> {
    day.iter().copied().find(|a| {
        half_of(a)
            .map(|h| if afternoon { h.covers_afternoon() } else { h.covers_morning() })
            .unwrap_or(false)
    })
}

/// Week view of one resource. `assignments` are that resource's live rows.
pub fn build_resource_schedule(
    resource: &Resource,
    kw: u32,
    year: i32,
    dates: &[NaiveDate; 5],
    assignments: &[AssignmentDetail],
) -> ResourceSchedule {
    let daily = daily_hours(resource.weekly_hours);

    let days: Vec<ScheduleDay> = dates
        .iter()
        .map(|date| {
            let day: Vec<&AssignmentDetail> = assignments
                .iter()
                .filter(|a| a.resource_id == resource.resource_id && a.assignment_date == *date)
                .collect();
            let assigned: f64 = day
                .iter()
                .filter_map(|a| half_of(a))
                .map(|h| h.hours(daily))
                .sum();

            ScheduleDay {
                date: *date,
                day_name: day_name(*date),
                morning: covering(&day, false).map(schedule_slot),
                afternoon: covering(&day, true).map(schedule_slot),
                assigned_hours: round2(assigned),
                available_hours: round2(daily),
            }
        })
        .collect();

    let total_assigned: f64 = days.iter().map(|d| d.assigned_hours).sum();
    let total_available: f64 = days.iter().map(|d| d.available_hours).sum();

    ResourceSchedule {
        resource: ScheduleResource {
            id: resource.resource_id.clone(),
            name: resource.name.clone(),
            short_code: resource.short_code.clone(),
            department: resource.department.clone(),
            employee_type: resource.employee_type.clone(),
            weekly_hours: effective_weekly_hours(resource.weekly_hours),
        },
        kw,
        year,
        date_range: DateRange {
            from: dates[0],
            to: dates[4],
        },
        days,
        week_summary: WeekSummary {
            total_assigned: round2(total_assigned),
            total_available: round2(total_available),
            utilization_percent: percent(total_assigned, total_available),
        },
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactSlot {
    pub task_id: String,
    pub short_label: String,
    pub status_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactDay {
    pub date: NaiveDate,
    pub day_name: &'static str,
    pub morning: Option<CompactSlot>,
    pub afternoon: Option<CompactSlot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceWeek {
    pub resource_id: String,
    pub resource_name: String,
    pub short_code: String,
    pub department: String,
    pub weekly_hours: f64,
    pub utilization_percent: f64,
    pub days: Vec<CompactDay>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesOverview {
    pub kw: u32,
    pub year: i32,
    pub resources: Vec<ResourceWeek>,
}

fn compact_slot(a: &AssignmentDetail) -> CompactSlot {
    let short_label = match a.project_order_number.as_deref() {
        Some(order) if !order.is_empty() => order.to_string(),
        _ => a.task_title.clone(),
    };
    CompactSlot {
        task_id: a.task_id.clone(),
        short_label,
        status_code: a.status_code.clone(),
    }
}

/// Compact week grid of every resource in `resources`, in the given order.
pub fn build_resources_overview(
    kw: u32,
    year: i32,
    dates: &[NaiveDate; 5],
    resources: &[Resource],
    assignments: &[AssignmentDetail],
) -> ResourcesOverview {
    let resources = resources
        .iter()
        .map(|r| {
            let daily = daily_hours(r.weekly_hours);
            let mine: Vec<&AssignmentDetail> = assignments
                .iter()
                .filter(|a| a.resource_id == r.resource_id)
                .collect();

            let assigned: f64 = mine
                .iter()
                .filter_map(|a| half_of(a))
                .map(|h| h.hours(daily))
                .sum();

            let days = dates
                .iter()
                .map(|date| {
                    let day: Vec<&AssignmentDetail> = mine
                        .iter()
                        .copied()
                        .filter(|a| a.assignment_date == *date)
                        .collect();
                    CompactDay {
                        date: *date,
                        day_name: day_name(*date),
                        morning: covering(&day, false).map(compact_slot),
                        afternoon: covering(&day, true).map(compact_slot),
                    }
                })
                .collect();

            ResourceWeek {
                resource_id: r.resource_id.clone(),
                resource_name: r.name.clone(),
                short_code: or_empty(&r.short_code),
                department: or_empty(&r.department),
                weekly_hours: effective_weekly_hours(r.weekly_hours),
                utilization_percent: percent(assigned, daily * dates.len() as f64),
                days,
            }
        })
        .collect();

    ResourcesOverview { kw, year, resources }
}

/// Copies of the source week's bookings moved onto the same weekdays of the
/// target week. Rows with an unknown half-day or status are left out; `None`
/// when either week does not exist.
pub fn shift_week(
    assignments: &[AssignmentDetail],
    source: (u32, i32),
    target: (u32, i32),
) -> Option<Vec<NewAssignment>> {
    let source_monday = week_dates(source.0, source.1)?[0];
    let target_monday = week_dates(target.0, target.1)?[0];
    let offset = target_monday - source_monday;

    Some(
        assignments
            .iter()
            .filter_map(|a| {
                let half_day = a.half_day.parse::<HalfDay>().ok()?;
                let status_code = a.status_code.parse::<StatusCode>().ok()?;
                Some(NewAssignment {
                    task_id: a.task_id.clone(),
                    resource_id: a.resource_id.clone(),
                    assignment_date: a.assignment_date + offset,
                    half_day,
                    status_code,
                    is_fixed: a.is_fixed,
                    notes: a.notes.clone(),
                    start_time: a.start_time,
                })
            })
            .collect(),
    )
}
