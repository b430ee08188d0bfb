mod auth;
mod config;
mod db;
mod entity;
mod error;
mod mail;
mod response;
mod routes;
mod setup;
mod templates;
#[cfg(test)]
mod test_utils;

use std::io;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use config::AppConfig;
use db::connect_db;
use log::{error, info};
use mail::Mailer;
use response::form_error_handler;

#[derive(Parser)]
#[command(name = "egm-site")]
#[command(about = "Personal website with a login-gated admin console")]
struct Cli {
    /// Initialize the database, seed the admin user from EGM_USER/EGM_PASS and exit
    #[arg(short = 'c', long = "create")]
    create: bool,
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let db = connect_db(&config).await.map_err(|e| {
        error!("database connection failed: {}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?;

    if cli.create {
        setup::create_data(&db, &config)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.msg()))?;
        return Ok(());
    }

    let tera = web::Data::new(templates::load().map_err(|e| {
        error!("template load failed: {:?}", e);
        io::Error::new(io::ErrorKind::Other, e.to_string())
    })?);
    let mailer: Arc<dyn Mailer> = Arc::from(mail::mailer_from_config(&config.mail));
    let mailer = web::Data::from(mailer);
    let server_port = config.server_port;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(tera.clone())
            .app_data(mailer.clone())
            .app_data(web::FormConfig::default().error_handler(form_error_handler))
            .wrap(middleware::Logger::default())
            .configure(routes::config)
    })
    .bind(("0.0.0.0", server_port))?;
    info!("server started at http://0.0.0.0:{}", server_port);
    server.run().await
}
