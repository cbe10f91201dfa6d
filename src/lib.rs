pub mod app_config;
pub mod cli;
pub mod error;
pub mod file_proc;
pub mod logging;
pub mod model;
pub mod store;
pub mod task;
pub mod utils;

pub use app_config::AppConfig;
pub use error::Error;
pub use file_proc::DupeOptions;
pub use model::{DuplicateGroup, FileEntry, IndexSnapshot};
pub use store::IndexStore;
pub use task::{CancelToken, TaskCoordinator, TaskHandle, TaskMessage, TaskState};
