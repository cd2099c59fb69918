pub mod settings_repository;
pub mod task_repository;

pub use settings_repository::SettingsRepository;
pub use task_repository::TaskRepository;
