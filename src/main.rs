use anyhow::Result;
use tokio::signal;

use crate::{
    crawler::coinbase::Coinbase,
    database::PostgresSQL,
    etl::{load::PostgresSink, Fault},
};

pub mod config;
pub mod crawler;
pub mod database;
pub mod declare;
pub mod etl;
pub mod logging;
pub mod scheduler;
pub mod util;

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        logging::error_console("A rustls crypto provider was already installed".to_string());
    }

    let app = config::App::load()?;
    let db = PostgresSQL::new(&app.postgresql.uri)?;

    check_connection(&db).await;
    db.create_schema().await?;
    logging::info_console("Tables created (if they did not exist).".to_string());

    let source = Coinbase::new(app.api.spot_price_url());
    let sink = PostgresSink::new(db.clone(), app.pipeline.print_table);

    logging::info_console(format!(
        "Starting the ETL pipeline loop against {}. Press Ctrl+C to stop.",
        source.url()
    ));

    let outcome = scheduler::run(
        &source,
        &sink,
        app.pipeline.interval(),
        app.pipeline.failure_policy,
        shutdown_signal(),
    )
    .await;

    db.close().await;

    outcome?;

    Ok(())
}

/// Pings the database once. A failure is reported and startup carries on.
async fn check_connection(db: &PostgresSQL) -> bool {
    match db.test_connection().await {
        Ok(_) => {
            logging::info_console("Connected to PostgreSQL".to_string());
            true
        }
        Err(why) => {
            let fault = Fault::Connectivity(why);
            logging::error_console(fault.to_string());
            logging::error_file_async(format!("{:?}", fault));
            false
        }
    }
}

/// Resolves on Ctrl+C. If the handler cannot be installed the process keeps
/// running and can only be stopped externally.
async fn shutdown_signal() {
    if let Err(why) = signal::ctrl_c().await {
        logging::error_console(format!("Failed to listen for Ctrl+C because {:?}", why));
        std::future::pending::<()>().await;
    }

    println!();
}
