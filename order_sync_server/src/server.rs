use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use log::info;
use marketplace_tools::{MarketplaceApi, MarketplaceConfig};
use order_sync_engine::{finance::FinancePolicy, AdminApi, RatesApi, SqliteDatabase, SyncApi};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        fees_backfill,
        get_rate,
        health,
        post_rate,
        recalculate_order,
        set_ad_fee,
        set_costs,
        set_earnings,
        sync_modified,
        sync_orders,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let marketplace = MarketplaceApi::new(MarketplaceConfig::from_env_or_default())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = HttpServer::new(move || {
        let policy = FinancePolicy::from_env_or_default();
        let engine = SyncApi::new(db.clone(), marketplace.clone(), policy.clone());
        let admin_api = AdminApi::new(db.clone(), policy);
        let rates_api = RatesApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mos::access_log"))
            .app_data(web::Data::new(engine))
            .app_data(web::Data::new(admin_api))
            .app_data(web::Data::new(rates_api))
            .service(health)
            .service(sync_orders)
            .service(sync_modified)
            .service(fees_backfill)
            .service(recalculate_order)
            .service(set_earnings)
            .service(set_ad_fee)
            .service(set_costs)
            .service(get_rate)
            .service(post_rate)
    })
    .bind((config.host.clone(), config.port))?;
    info!("🚀️ Server bound to {}:{}", config.host, config.port);
    Ok(srv.run())
}
