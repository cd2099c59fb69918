pub mod dependency;
pub mod planning;
pub mod settings;
pub mod task;
