use clap::Parser;
use pursuit::cli::{Args, build_config, init_logging, load_jwt_secret, open_database};
use pursuit::metrics::install_prometheus_exporter;
use pursuit::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    if let Some(port) = args.metrics_port {
        if let Err(e) = install_prometheus_exporter(port) {
            error!(port, error = %e, "Failed to start metrics exporter");
            std::process::exit(1);
        }
        info!(port, "Prometheus metrics exporter started");
    }

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let config = build_config(
        db,
        jwt_secret,
        args.platform,
        args.login_rate_limit,
        args.signup_rate_limit,
    );

    init_cleanup(&config.db, config.clock.clone()).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, platform = ?args.platform, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
