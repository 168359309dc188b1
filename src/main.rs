use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use valley_cms::config::Settings;
use valley_cms::openapi::ApiDoc;
use valley_cms::repo::{inmem::InMemRepo, pg::PgRepo};
use valley_cms::storage::{AssetStore, S3AssetStore};
use valley_cms::{config, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("invalid configuration: {e:#}");
            eprintln!("Please copy .env.example to .env and configure it");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping valley-cms");
    info!("Frontend origins: {:?}", settings.frontend_urls);
    info!("Asset prefix: {}", settings.assets.prefix);

    let store: Arc<dyn AssetStore> = match S3AssetStore::new(&settings.storage).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("failed to initialise object store: {e:#}");
            std::process::exit(1);
        }
    };

    let state = match &settings.database_url {
        Some(db_url) => {
            use sqlx::postgres::PgPoolOptions;
            let pool = PgPoolOptions::new()
                .max_connections(settings.db_max_connections)
                .connect_lazy(db_url)
                .map_err(std::io::Error::other)?;
            let repo = PgRepo::new(pool);
            repo.migrate().await.map_err(std::io::Error::other)?;
            info!("Using Postgres repository backend");
            AppState::new(repo, store, &settings.assets, settings.uploads)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory repository (data is lost on restart)");
            AppState::new(InMemRepo::new(), store, &settings.assets, settings.uploads)
        }
    };

    let openapi = ApiDoc::openapi();
    let frontend_urls = settings.frontend_urls.clone();

    let server = HttpServer::new(move || {
        let cors = frontend_urls
            .iter()
            .fold(Cors::default(), |c, origin| c.allowed_origin(origin))
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind((settings.bind_addr.as_str(), settings.port))?;

    info!("Listening on http://{}:{}", settings.bind_addr, settings.port);

    server.run().await
}
