use config::Config;
use events::EventPublisher;
use hub::{HubHandle, RoomAuthorizer};
use log::info;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::sync::Arc;
use tokio::time::Duration;

pub mod config;
pub mod logging;

pub async fn init_database(config: &Config) -> Result<DatabaseConnection, DbErr> {
    info!(
        "Database pool config: max_connections={}, min_connections={}, \
         connect_timeout={}s, acquire_timeout={}s",
        config.db_max_connections,
        config.db_min_connections,
        config.db_connect_timeout_secs,
        config.db_acquire_timeout_secs,
    );

    let mut opt = ConnectOptions::new::<&str>(config.database_url());
    opt.max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    Ok(db)
}

// Service-level state shared by every request handler and websocket session.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub hub: HubHandle,
    pub room_authorizer: Arc<dyn RoomAuthorizer>,
    pub event_publisher: Arc<EventPublisher>,
}

impl AppState {
    pub fn new(
        app_config: Config,
        hub: HubHandle,
        room_authorizer: Arc<dyn RoomAuthorizer>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config: app_config,
            hub,
            room_authorizer,
            event_publisher,
        }
    }
}
