mod config;
mod error;
mod services;
mod stores;

use crate::config::Config;
use crate::services::drafts::DraftService;
use crate::stores::{BlobStore, FsBlobStore, SqliteStore};
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cfg = Config::from_env();

    let store = Arc::new(SqliteStore::new(&cfg.db_path));
    store.init_schema().map_err(std::io::Error::other)?;
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(
        &cfg.blob_root,
        cfg.url_secret.clone(),
        cfg.base_url.clone(),
    ));

    // Stores are injected here; the orchestrator holds no ambient state.
    let service = DraftService::new(store.clone(), store.clone(), store.clone(), blobs.clone());
    let service_data = web::Data::new(service);
    let blob_data = web::Data::from(blobs);

    info!("Server running at http://{}:{}", cfg.host, cfg.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(1024 * 1024)) // 1 MB
            .app_data(service_data.clone())
            .app_data(blob_data.clone())
            .service(services::drafts::configure_routes())
            .service(services::files::configure_routes())
    })
    .bind((cfg.host.as_str(), cfg.port))?
    .run()
    .await
}
