use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::calendar::{daily_hours, day_name, effective_weekly_hours, percent, round2};
use crate::models::enums::{Choice, Department, HalfDay};
use crate::models::resource::Resource;
use crate::models::task_assignment::AssignmentDetail;

const UNASSIGNED: &str = "unassigned";
const OVERBOOKED_LIST_LEN: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodAssignment {
    pub task_id: String,
    pub project_name: String,
    pub half_day: String,
    pub status_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodCapacity {
    pub date: NaiveDate,
    pub day_name: &'static str,
    pub available_hours: f64,
    pub assigned_hours: f64,
    pub utilization_percent: f64,
    pub assignments: Vec<PeriodAssignment>,
    pub is_overbooked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCapacity {
    pub resource_id: String,
    pub resource_name: String,
    pub short_code: String,
    pub department: String,
    pub employee_type: String,
    pub weekly_hours: f64,
    pub periods: Vec<PeriodCapacity>,
}

impl ResourceCapacity {
    pub fn total_available(&self) -> f64 {
        self.periods.iter().map(|p| p.available_hours).sum()
    }

    pub fn total_assigned(&self) -> f64 {
        self.periods.iter().map(|p| p.assigned_hours).sum()
    }

    pub fn has_overbooked_day(&self) -> bool {
        self.periods.iter().any(|p| p.is_overbooked)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCapacity {
    pub department: String,
    pub label: String,
    pub resource_count: usize,
    pub total_available_hours: f64,
    pub total_assigned_hours: f64,
    pub utilization_percent: f64,
    pub overbooked_count: usize,
    pub resources: Vec<ResourceCapacity>,
}

impl DepartmentCapacity {
    fn empty(department: Department) -> Self {
        DepartmentCapacity {
            department: department.as_str().to_string(),
            label: department.label().to_string(),
            resource_count: 0,
            total_available_hours: 0.0,
            total_assigned_hours: 0.0,
            utilization_percent: 0.0,
            overbooked_count: 0,
            resources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverbookedResource {
    pub resource_id: String,
    pub resource_name: String,
    pub short_code: String,
    pub department: String,
    pub utilization_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityOverview {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_available_hours: f64,
    pub total_assigned_hours: f64,
    pub utilization_percent: f64,
    pub overbooked_resources: Vec<OverbookedResource>,
    pub departments: Vec<DepartmentCapacity>,
}

/// Day-by-day capacity of one resource over `dates`.
///
/// `assignments` may contain rows of other resources or dates; only the
/// matching ones are counted. Unknown half-day values count as zero hours.
pub fn build_resource_capacity(
    resource: &Resource,
    dates: &[NaiveDate],
    assignments: &[&AssignmentDetail],
) -> ResourceCapacity {
    let daily = daily_hours(resource.weekly_hours);

    let periods = dates
        .iter()
        .map(|date| {
            let mut assigned = 0.0;
            let mut period_assignments = Vec::new();

            for a in assignments
                .iter()
                .filter(|a| a.assignment_date == *date && a.resource_id == resource.resource_id)
            {
                assigned += a
                    .half_day
                    .parse::<HalfDay>()
                    .map(|half| half.hours(daily))
                    .unwrap_or(0.0);
                period_assignments.push(PeriodAssignment {
                    task_id: a.task_id.clone(),
                    project_name: a.project_name.clone(),
                    half_day: a.half_day.clone(),
                    status_code: if a.status_code.is_empty() {
                        "assigned".to_string()
                    } else {
                        a.status_code.clone()
                    },
                });
            }

            PeriodCapacity {
                date: *date,
                day_name: day_name(*date),
                available_hours: round2(daily),
                assigned_hours: round2(assigned),
                utilization_percent: percent(assigned, daily),
                assignments: period_assignments,
                is_overbooked: assigned > daily,
            }
        })
        .collect();

    ResourceCapacity {
        resource_id: resource.resource_id.clone(),
        resource_name: resource.name.clone(),
        short_code: resource.short_code.clone().unwrap_or_default(),
        department: resource.department.clone().unwrap_or_default(),
        employee_type: resource.employee_type.clone().unwrap_or_default(),
        weekly_hours: effective_weekly_hours(resource.weekly_hours),
        periods,
    }
}

fn department_capacity(department: Department, resources: Vec<ResourceCapacity>) -> DepartmentCapacity {
    let available: f64 = resources.iter().map(ResourceCapacity::total_available).sum();
    let assigned: f64 = resources.iter().map(ResourceCapacity::total_assigned).sum();

    DepartmentCapacity {
        department: department.as_str().to_string(),
        label: department.label().to_string(),
        resource_count: resources.len(),
        total_available_hours: round2(available),
        total_assigned_hours: round2(assigned),
        utilization_percent: percent(assigned, available),
        overbooked_count: resources.iter().filter(|r| r.has_overbooked_day()).count(),
        resources,
    }
}

/// Capacity of every department (or only `filter`) over the weekdays of `[from, to]`.
pub fn build_overview(
    from: NaiveDate,
    to: NaiveDate,
    filter: Option<Department>,
    resources: &[Resource],
    assignments: &[AssignmentDetail],
) -> CapacityOverview {
    let dates = super::calendar::weekdays_between(from, to);
    let shown: Vec<Department> = match filter {
        Some(dept) => vec![dept],
        None => Department::ALL.to_vec(),
    };

    let selected: Vec<&Resource> = resources
        .iter()
        .filter(|r| match filter {
            Some(dept) => r.department.as_deref() == Some(dept.as_str()),
            None => true,
        })
        .collect();

    if selected.is_empty() || dates.is_empty() {
        return CapacityOverview {
            from,
            to,
            total_available_hours: 0.0,
            total_assigned_hours: 0.0,
            utilization_percent: 0.0,
            overbooked_resources: Vec::new(),
            departments: shown.into_iter().map(DepartmentCapacity::empty).collect(),
        };
    }

    let mut by_resource: HashMap<&str, Vec<&AssignmentDetail>> = HashMap::new();
    for a in assignments {
        by_resource.entry(a.resource_id.as_str()).or_default().push(a);
    }

    let capacities: Vec<ResourceCapacity> = selected
        .iter()
        .map(|r| {
            let rows = by_resource
                .get(r.resource_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            build_resource_capacity(r, &dates, rows)
        })
        .collect();

    let mut overbooked: Vec<OverbookedResource> = capacities
        .iter()
        .map(|r| OverbookedResource {
            resource_id: r.resource_id.clone(),
            resource_name: r.resource_name.clone(),
            short_code: r.short_code.clone(),
            department: r.department.clone(),
            utilization_percent: percent(r.total_assigned(), r.total_available()),
        })
        .filter(|r| r.utilization_percent > 100.0)
        .collect();
    overbooked.sort_by(|a, b| b.utilization_percent.total_cmp(&a.utilization_percent));
    overbooked.truncate(OVERBOOKED_LIST_LEN);

    let mut by_department: HashMap<String, Vec<ResourceCapacity>> = HashMap::new();
    for rc in capacities {
        let key = if rc.department.is_empty() {
            UNASSIGNED.to_string()
        } else {
            rc.department.clone()
        };
        by_department.entry(key).or_default().push(rc);
    }

    let departments: Vec<DepartmentCapacity> = shown
        .into_iter()
        .map(|dept| {
            let members = by_department.remove(dept.as_str()).unwrap_or_default();
            department_capacity(dept, members)
        })
        .collect();

    let available: f64 = departments.iter().map(|d| d.total_available_hours).sum();
    let assigned: f64 = departments.iter().map(|d| d.total_assigned_hours).sum();

    CapacityOverview {
        from,
        to,
        total_available_hours: round2(available),
        total_assigned_hours: round2(assigned),
        utilization_percent: percent(assigned, available),
        overbooked_resources: overbooked,
        departments,
    }
}

/// The single department section of a filtered overview.
pub fn build_department(
    department: Department,
    from: NaiveDate,
    to: NaiveDate,
    resources: &[Resource],
    assignments: &[AssignmentDetail],
) -> DepartmentCapacity {
    build_overview(from, to, Some(department), resources, assignments)
        .departments
        .into_iter()
        .next()
        .unwrap_or_else(|| DepartmentCapacity::empty(department))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{assignment, resource};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn one_full_day_and_one_morning_over_a_week() {
        let hans = resource("r1", "Hans", Some("cnc"), None);
        let rows = vec![
            assignment("a1", "r1", "t1", "2026-02-02", "full_day"),
            assignment("a2", "r1", "t2", "2026-02-03", "morning"),
        ];
        let refs: Vec<&AssignmentDetail> = rows.iter().collect();
        let dates = super::super::calendar::weekdays_between(d("2026-02-02"), d("2026-02-06"));

        let rc = build_resource_capacity(&hans, &dates, &refs);

        assert_eq!(rc.periods.len(), 5);
        assert_eq!(rc.periods[0].assigned_hours, 8.5);
        assert_eq!(rc.periods[0].utilization_percent, 100.0);
        assert_eq!(rc.periods[1].assigned_hours, 4.25);
        assert_eq!(rc.periods[1].utilization_percent, 50.0);
        assert_eq!(rc.periods[1].day_name, "Dienstag");
        assert!(rc.periods.iter().all(|p| p.available_hours == 8.5));
        assert!(!rc.has_overbooked_day());
        assert_eq!(rc.weekly_hours, 42.5);
    }

    #[test]
    fn double_booking_marks_the_day_overbooked() {
        let anna = resource("r1", "Anna", Some("montage"), Some(20.0));
        let rows = vec![
            assignment("a1", "r1", "t1", "2026-02-02", "full_day"),
            assignment("a2", "r1", "t2", "2026-02-02", "morning"),
        ];
        let refs: Vec<&AssignmentDetail> = rows.iter().collect();

        let rc = build_resource_capacity(&anna, &[d("2026-02-02")], &refs);

        assert_eq!(rc.periods[0].available_hours, 4.0);
        assert_eq!(rc.periods[0].assigned_hours, 6.0);
        assert_eq!(rc.periods[0].utilization_percent, 150.0);
        assert!(rc.periods[0].is_overbooked);
    }

    #[test]
    fn status_code_defaults_to_assigned() {
        let hans = resource("r1", "Hans", Some("cnc"), None);
        let mut row = assignment("a1", "r1", "t1", "2026-02-02", "afternoon");
        row.status_code = String::new();

        let rc = build_resource_capacity(&hans, &[d("2026-02-02")], &[&row]);

        assert_eq!(rc.periods[0].assignments[0].status_code, "assigned");
    }

    #[test]
    fn overview_groups_by_department_in_board_order() {
        let resources = vec![
            resource("r1", "Hans", Some("montage"), None),
            resource("r2", "Eva", Some("cnc"), None),
            resource("r3", "Max", None, None),
        ];
        let rows = vec![
            assignment("a1", "r1", "t1", "2026-02-02", "full_day"),
            assignment("a2", "r1", "t2", "2026-02-02", "full_day"),
            assignment("a3", "r3", "t3", "2026-02-02", "full_day"),
            assignment("a4", "r3", "t4", "2026-02-02", "morning"),
        ];

        let overview = build_overview(d("2026-02-02"), d("2026-02-02"), None, &resources, &rows);

        let keys: Vec<&str> = overview.departments.iter().map(|d| d.department.as_str()).collect();
        assert_eq!(
            keys,
            vec!["zuschnitt", "cnc", "produktion", "behandlung", "beschlaege", "transport", "montage", "buero"]
        );
        let montage = &overview.departments[6];
        assert_eq!(montage.resource_count, 1);
        assert_eq!(montage.total_assigned_hours, 17.0);
        assert_eq!(montage.utilization_percent, 200.0);
        assert_eq!(montage.overbooked_count, 1);

        // r3 has no department: not listed in a section, but overbooked nonetheless
        assert_eq!(overview.total_available_hours, 17.0);
        assert_eq!(overview.total_assigned_hours, 17.0);
        assert_eq!(overview.overbooked_resources.len(), 2);
        assert_eq!(overview.overbooked_resources[0].resource_id, "r1");
        assert_eq!(overview.overbooked_resources[1].utilization_percent, 150.0);
    }

    #[test]
    fn overbooked_list_keeps_the_top_five() {
        let resources: Vec<Resource> = (0..7)
            .map(|i| resource(&format!("r{}", i), "X", Some("produktion"), None))
            .collect();
        let mut rows = Vec::new();
        for i in 0..7 {
            rows.push(assignment(&format!("a{}", i), &format!("r{}", i), "t", "2026-02-02", "full_day"));
            for extra in 0..i {
                rows.push(assignment(
                    &format!("b{}{}", i, extra),
                    &format!("r{}", i),
                    "t",
                    "2026-02-02",
                    "morning",
                ));
            }
        }

        let overview = build_overview(d("2026-02-02"), d("2026-02-02"), None, &resources, &rows);

        let ids: Vec<&str> = overview
            .overbooked_resources
            .iter()
            .map(|r| r.resource_id.as_str())
            .collect();
        assert_eq!(ids, vec!["r6", "r5", "r4", "r3", "r2"]);
    }

    #[test]
    fn weekend_only_range_yields_zeroed_departments() {
        let resources = vec![resource("r1", "Hans", Some("cnc"), None)];

        let overview = build_overview(d("2026-02-07"), d("2026-02-08"), None, &resources, &[]);

        assert_eq!(overview.departments.len(), 8);
        assert!(overview.departments.iter().all(|d| d.resource_count == 0));
        assert_eq!(overview.utilization_percent, 0.0);
    }

    #[test]
    fn department_filter_returns_only_that_section() {
        let resources = vec![
            resource("r1", "Hans", Some("cnc"), None),
            resource("r2", "Eva", Some("montage"), None),
        ];

        let dept = build_department(Department::Cnc, d("2026-02-02"), d("2026-02-06"), &resources, &[]);

        assert_eq!(dept.department, "cnc");
        assert_eq!(dept.label, "CNC");
        assert_eq!(dept.resource_count, 1);
        assert_eq!(dept.total_available_hours, 42.5);
        assert_eq!(dept.utilization_percent, 0.0);
    }

    #[test]
    fn empty_department_keeps_its_label() {
        let dept = build_department(Department::Beschlaege, d("2026-02-02"), d("2026-02-06"), &[], &[]);

        assert_eq!(dept.label, "Beschläge");
        assert!(dept.resources.is_empty());
    }
}
