pub mod calendar;
pub mod dependency_service;
pub mod plan_assembler;
pub mod planner_service;
pub mod schedule_utils;
pub mod slot_assigner;
pub mod slot_generator;
pub mod task_scorer;
