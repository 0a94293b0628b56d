use dotenvy::dotenv;
use snafu::ResultExt as _;
use tera::Tera;
use tokio::net::TcpListener;

use folio::api::{create_router, App};
use folio::config::Config;
use folio::database::Database;
use folio::error::{
    ApplicationError, BindAddressSnafu, ConnectDatabaseSnafu, LoadTemplatesSnafu, WebServerSnafu,
};
use folio::logger;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    let database = Database::connect(&config.database)
        .await
        .context(ConnectDatabaseSnafu)?;
    let templates = Tera::new(&config.template_glob()).context(LoadTemplatesSnafu)?;

    let app = App::new(
        database,
        config.authenticator(),
        config.storage(),
        config.sessions(),
        templates,
    );
    let router = create_router(app);

    let listener = TcpListener::bind(config.host)
        .await
        .context(BindAddressSnafu {
            address: config.host,
        })?;
    tracing::info!(address = %config.host, public_url = %config.public_url, "serving");

    axum::serve(listener, router).await.context(WebServerSnafu)
}
