use std::collections::{HashMap, VecDeque};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::calendar::{is_weekday, iso_week_of};
use crate::models::enums::{Department, DependencyType};

/// `task_id` depends on `depends_on_task_id`.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    pub task_id: String,
    pub depends_on_task_id: String,
    pub dependency_type: DependencyType,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskShift {
    pub task_id: String,
    pub delta_days: i64,
}

/// Shifts `root` by `delta_days` and pushes every downstream task forward just
/// far enough to keep its dependency satisfied. Tasks that need no move are
/// left out; the root comes first.
pub fn cascade_shifts(
    root: &str,
    delta_days: i64,
    edges: &[DependencyEdge],
    windows: &HashMap<String, TaskWindow>,
) -> Vec<TaskShift> {
    let mut children: HashMap<&str, Vec<&DependencyEdge>> = HashMap::new();
    for edge in edges {
        children.entry(edge.depends_on_task_id.as_str()).or_default().push(edge);
    }

    let mut order: Vec<String> = vec![root.to_string()];
    let mut shifts: HashMap<String, i64> = HashMap::from([(root.to_string(), delta_days)]);
    let mut queue: VecDeque<String> = VecDeque::from([root.to_string()]);
    // a cycle would push forever; each edge may fire a bounded number of times
    let mut budget = (edges.len() + 1) * (edges.len() + 1);

    while let Some(current) = queue.pop_front() {
        if budget == 0 {
            break;
        }
        budget -= 1;

        let current_shift = shifts.get(&current).copied().unwrap_or(0);
        let parent = windows.get(&current).copied().unwrap_or_default();

        for edge in children.get(current.as_str()).map(Vec::as_slice).unwrap_or(&[]) {
            let child_id = edge.task_id.as_str();
            let existing = shifts.get(child_id).copied().unwrap_or(0);
            let child = windows.get(child_id).copied().unwrap_or_default();

            let parent_anchor = match edge.dependency_type {
                DependencyType::StartStart => parent.start,
                _ => parent.end,
            };
            let child_anchor = match edge.dependency_type {
                DependencyType::FinishFinish => child.end,
                _ => child.start,
            };

            let next = match (parent_anchor, child_anchor) {
                (Some(p), Some(c)) => {
                    let gap = ((p + Duration::days(current_shift)) - (c + Duration::days(existing))).num_days();
                    if gap > 0 {
                        existing + gap
                    } else {
                        existing
                    }
                }
                _ if current_shift > 0 => existing.max(current_shift),
                _ => existing,
            };

            if next > existing {
                if !shifts.contains_key(child_id) {
                    order.push(child_id.to_string());
                }
                shifts.insert(child_id.to_string(), next);
                queue.push_back(child_id.to_string());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| {
            let delta = shifts.get(&id).copied().unwrap_or(0);
            (delta != 0).then_some(TaskShift {
                task_id: id,
                delta_days: delta,
            })
        })
        .collect()
}

/// True when adding the edge `task_id -> depends_on` would close a cycle,
/// i.e. `depends_on` already (transitively) depends on `task_id`.
pub fn creates_cycle(task_id: &str, depends_on: &str, edges: &[DependencyEdge]) -> bool {
    if task_id == depends_on {
        return true;
    }
    let mut stack = vec![depends_on];
    let mut seen: Vec<&str> = Vec::new();
    while let Some(current) = stack.pop() {
        if current == task_id {
            return true;
        }
        if seen.contains(&current) {
            continue;
        }
        seen.push(current);
        stack.extend(
            edges
                .iter()
                .filter(|e| e.task_id == current)
                .map(|e| e.depends_on_task_id.as_str()),
        );
    }
    false
}

/// Every task reachable from `root` over dependency edges in either direction,
/// `root` first. A block shift moves all of them by the same delta.
pub fn connected_tasks(root: &str, edges: &[DependencyEdge]) -> Vec<String> {
    let mut neighbours: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        neighbours.entry(edge.task_id.as_str()).or_default().push(edge.depends_on_task_id.as_str());
        neighbours.entry(edge.depends_on_task_id.as_str()).or_default().push(edge.task_id.as_str());
    }

    let mut block: Vec<String> = vec![root.to_string()];
    let mut queue: VecDeque<&str> = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        for next in neighbours.get(current).map(Vec::as_slice).unwrap_or(&[]) {
            if !block.iter().any(|id| id == next) {
                block.push(next.to_string());
                queue.push_back(next);
            }
        }
    }
    block
}

#[derive(Debug, Clone)]
pub struct AutoScheduleTask {
    pub task_id: String,
    pub title: String,
    pub duration_minutes: Option<i32>,
    pub phase: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTask {
    pub task_id: String,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub phase: Option<Department>,
    pub kw: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Default)]
pub struct AutoSchedulePlan {
    pub planned: Vec<PlannedTask>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkCalendar {
    pub include_weekends: bool,
    pub workday_minutes: i64,
}

impl WorkCalendar {
    fn is_workday(&self, date: NaiveDate) -> bool {
        self.include_weekends || is_weekday(date)
    }

    fn last_workday_on_or_before(&self, mut date: NaiveDate) -> NaiveDate {
        while !self.is_workday(date) {
            date -= Duration::days(1);
        }
        date
    }

    fn previous_workday(&self, date: NaiveDate) -> NaiveDate {
        self.last_workday_on_or_before(date - Duration::days(1))
    }

    pub fn working_days(&self, duration_minutes: Option<i32>) -> i64 {
        let minutes = i64::from(duration_minutes.unwrap_or(0).max(0));
        let per_day = self.workday_minutes.max(1);
        ((minutes + per_day - 1) / per_day).max(1)
    }
}

/// Lays `tasks` out back to back so the last one ends on `end_date`.
/// Earlier tasks in the list come first in time.
pub fn backward_schedule(tasks: &[AutoScheduleTask], end_date: NaiveDate, calendar: WorkCalendar) -> AutoSchedulePlan {
    let mut plan = AutoSchedulePlan::default();
    let mut cursor = calendar.last_workday_on_or_before(end_date);

    for task in tasks.iter().rev() {
        let due = cursor;
        let mut start = due;
        for _ in 1..calendar.working_days(task.duration_minutes) {
            start = calendar.previous_workday(start);
        }
        cursor = calendar.previous_workday(start);

        let phase = task
            .phase
            .as_deref()
            .and_then(|p| p.parse::<Department>().ok())
            .filter(Department::is_phase);
        if phase.is_none() {
            plan.warnings.push(format!(
                "Task \"{}\" has no phase; no phase schedule was created",
                task.title
            ));
        }

        let (kw, year) = iso_week_of(start);
        plan.planned.push(PlannedTask {
            task_id: task.task_id.clone(),
            start_date: start,
            due_date: due,
            phase,
            kw,
            year,
        });
    }

    plan.planned.reverse();
    plan.warnings.reverse();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn edge(child: &str, parent: &str, kind: DependencyType) -> DependencyEdge {
        DependencyEdge {
            task_id: child.to_string(),
            depends_on_task_id: parent.to_string(),
            dependency_type: kind,
        }
    }

    fn window(start: &str, end: &str) -> TaskWindow {
        TaskWindow {
            start: Some(d(start)),
            end: Some(d(end)),
        }
    }

    #[test]
    fn finish_start_child_moves_only_as_far_as_needed() {
        let edges = vec![edge("b", "a", DependencyType::FinishStart)];
        let windows = HashMap::from([
            ("a".to_string(), window("2026-02-02", "2026-02-04")),
            ("b".to_string(), window("2026-02-06", "2026-02-10")),
        ]);

        let shifts = cascade_shifts("a", 5, &edges, &windows);

        // a ends on the 9th after the move, b starts on the 6th: b needs +3
        assert_eq!(
            shifts,
            vec![
                TaskShift { task_id: "a".into(), delta_days: 5 },
                TaskShift { task_id: "b".into(), delta_days: 3 },
            ]
        );
    }

    #[test]
    fn slack_absorbs_a_small_shift() {
        let edges = vec![edge("b", "a", DependencyType::FinishStart)];
        let windows = HashMap::from([
            ("a".to_string(), window("2026-02-02", "2026-02-03")),
            ("b".to_string(), window("2026-02-10", "2026-02-12")),
        ]);

        let shifts = cascade_shifts("a", 2, &edges, &windows);

        assert_eq!(shifts.len(), 1);
    }

    #[test]
    fn start_start_and_finish_finish_use_their_anchors() {
        let edges = vec![
            edge("b", "a", DependencyType::StartStart),
            edge("c", "a", DependencyType::FinishFinish),
        ];
        let windows = HashMap::from([
            ("a".to_string(), window("2026-02-02", "2026-02-06")),
            ("b".to_string(), window("2026-02-03", "2026-02-20")),
            ("c".to_string(), window("2026-01-20", "2026-02-08")),
        ]);

        let shifts = cascade_shifts("a", 4, &edges, &windows);

        assert_eq!(shifts[1], TaskShift { task_id: "b".into(), delta_days: 3 });
        assert_eq!(shifts[2], TaskShift { task_id: "c".into(), delta_days: 2 });
    }

    #[test]
    fn undated_children_follow_the_full_shift_and_chains_propagate() {
        let edges = vec![
            edge("b", "a", DependencyType::FinishStart),
            edge("c", "b", DependencyType::FinishStart),
        ];
        let windows = HashMap::from([("a".to_string(), window("2026-02-02", "2026-02-03"))]);

        let shifts = cascade_shifts("a", 7, &edges, &windows);

        let ids: Vec<&str> = shifts.iter().map(|s| s.task_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(shifts.iter().all(|s| s.delta_days == 7));
    }

    #[test]
    fn backward_moves_never_pull_dependents() {
        let edges = vec![edge("b", "a", DependencyType::FinishStart)];
        let windows = HashMap::from([
            ("a".to_string(), window("2026-02-02", "2026-02-04")),
            ("b".to_string(), window("2026-02-05", "2026-02-06")),
        ]);

        let shifts = cascade_shifts("a", -3, &edges, &windows);

        assert_eq!(shifts, vec![TaskShift { task_id: "a".into(), delta_days: -3 }]);
    }

    #[test]
    fn a_block_reaches_parents_and_children() {
        let edges = vec![
            edge("b", "a", DependencyType::FinishStart),
            edge("c", "b", DependencyType::StartStart),
            edge("b", "x", DependencyType::FinishFinish),
            edge("z", "y", DependencyType::FinishStart),
        ];

        assert_eq!(connected_tasks("b", &edges), vec!["b", "a", "c", "x"]);
        assert_eq!(connected_tasks("y", &edges), vec!["y", "z"]);
        assert_eq!(connected_tasks("lonely", &edges), vec!["lonely"]);
    }

    #[test]
    fn detects_cycles_before_they_are_stored() {
        let edges = vec![
            edge("b", "a", DependencyType::FinishStart),
            edge("c", "b", DependencyType::FinishStart),
        ];

        assert!(creates_cycle("a", "c", &edges));
        assert!(creates_cycle("a", "a", &edges));
        assert!(!creates_cycle("c", "a", &edges));
    }

    fn task(id: &str, minutes: Option<i32>, phase: Option<&str>) -> AutoScheduleTask {
        AutoScheduleTask {
            task_id: id.to_string(),
            title: format!("Task {}", id),
            duration_minutes: minutes,
            phase: phase.map(str::to_string),
        }
    }

    #[test]
    fn lays_tasks_out_backwards_skipping_weekends() {
        let calendar = WorkCalendar {
            include_weekends: false,
            workday_minutes: 540,
        };
        let tasks = vec![
            task("t1", Some(1080), Some("cnc")),
            task("t2", Some(600), Some("montage")),
        ];

        // Sunday: the last task ends on the preceding Friday
        let plan = backward_schedule(&tasks, d("2026-02-15"), calendar);

        assert_eq!(plan.planned[1].due_date, d("2026-02-13"));
        assert_eq!(plan.planned[1].start_date, d("2026-02-12"));
        assert_eq!(plan.planned[0].due_date, d("2026-02-11"));
        assert_eq!(plan.planned[0].start_date, d("2026-02-10"));
        assert_eq!(plan.planned[0].kw, 7);
        assert_eq!(plan.planned[0].phase, Some(Department::Cnc));
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn weekends_count_when_the_project_works_them() {
        let calendar = WorkCalendar {
            include_weekends: true,
            workday_minutes: 480,
        };
        let tasks = vec![task("t1", Some(960), None)];

        let plan = backward_schedule(&tasks, d("2026-02-15"), calendar);

        assert_eq!(plan.planned[0].start_date, d("2026-02-14"));
        assert_eq!(plan.planned[0].due_date, d("2026-02-15"));
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("Task t1"));
    }

    #[test]
    fn missing_duration_takes_one_day() {
        let calendar = WorkCalendar {
            include_weekends: false,
            workday_minutes: 540,
        };
        assert_eq!(calendar.working_days(None), 1);
        assert_eq!(calendar.working_days(Some(540)), 1);
        assert_eq!(calendar.working_days(Some(541)), 2);
    }
}
