use sea_orm::Database;
use tracing::info;

use onetime_code::config::OnetimeCodeConfig;
use onetime_code::infra::db::DbCodeStorage;
use onetime_code::usecase::store::OnetimeCodeStore;
use onetime_core::config::Config;
use onetime_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = OnetimeCodeConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let store = OnetimeCodeStore::new(DbCodeStorage::new(db)).with_ttl(config.ttl());
    store
        .build_index()
        .await
        .expect("failed to build onetime code index");

    store
        .run_reaper(config.reaper_interval(), async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await;
}
