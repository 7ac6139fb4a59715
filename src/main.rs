use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use splitledger::{
    auth::Authenticator,
    config::Config,
    routes,
    store::{InMemoryStore, LedgerStore, MongoStore},
    Ledger,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{}", err);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn LedgerStore> = match &config.mongodb_uri {
        Some(uri) => match MongoStore::connect(uri, &config.database).await {
            Ok(store) => {
                tracing::info!(database = %config.database, "connected to MongoDB");
                Arc::new(store)
            }
            Err(err) => {
                tracing::error!("failed to connect: {}", err);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("MONGODB_URI is not set, keeping the ledger in memory");
            Arc::new(InMemoryStore::new())
        }
    };

    let ledger = Ledger::new(store);
    if config.seed_demo_data {
        if let Err(err) = ledger.seed_if_empty().await {
            tracing::error!("demo seed failed: {}", err);
        }
    }
    let authenticator = Authenticator::new(config.service_token.clone());

    tracing::info!(host = %config.host, port = config.port, "starting server");
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .app_data(web::Data::new(ledger.clone()))
            .app_data(web::Data::new(authenticator.clone()))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
