use crate::config::AppConfig;
use crate::services::srcei::SlotSource;

pub struct AppState {
    pub config: AppConfig,
    pub slots: Box<dyn SlotSource>,
}
