// src/models/mod.rs

pub mod enums;
pub mod user;
pub mod resource;
pub mod project;
pub mod task;
pub mod dependency;
pub mod phase_schedule;
pub mod task_assignment;
pub mod work_slot;
pub mod pendenz;

#[cfg(test)]
pub mod test_support;
