//! Calendar arithmetic and the aggregations behind the capacity and weekly-board
//! endpoints. Nothing in here touches the database.

pub mod calendar;
pub mod capacity;
pub mod schedule;
pub mod slots;
pub mod week_plan;
