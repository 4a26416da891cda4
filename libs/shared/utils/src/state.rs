use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::DataContext;

/// Router state shared by every cell.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub data: DataContext,
}

impl AppState {
    pub fn new(config: AppConfig, data: DataContext) -> Self {
        Self {
            config: Arc::new(config),
            data,
        }
    }
}
