// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use lanshare_server::api::router;
use lanshare_server::config::{
    DATA_DIR_ENV, DEFAULT_DATA_DIR, HOST_ENV, LOG_FORMAT_ENV, PORT_ENV, PUBLIC_BASE_URL_ENV,
};
use lanshare_server::state::AppState;
use lanshare_server::storage::{BlobStore, ShareDb};
use lanshare_server::sweep_task::SweepTask;

#[tokio::main]
async fn main() {
    init_tracing();

    // Parse bind address
    let host = env::var(HOST_ENV).unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var(PORT_ENV)
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    // Blob reference URLs must be reachable by LAN peers; default to the
    // bind address when no public base is configured.
    let public_base = env::var(PUBLIC_BASE_URL_ENV)
        .unwrap_or_else(|_| format!("http://{host}:{port}"));
    let public_base: Url = public_base
        .parse()
        .expect("Failed to parse PUBLIC_BASE_URL");

    // Initialize storage
    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let db = ShareDb::open(&std::path::Path::new(&data_dir).join("share.redb"))
        .expect("Failed to open share database");
    let blobs = BlobStore::new(&data_dir, public_base);
    blobs.initialize().expect("Failed to create blob directory");

    let state = AppState::new(db, blobs);
    let app = router(state.clone());

    // Background sweep loop with graceful shutdown
    let shutdown = CancellationToken::new();
    let sweep_task = SweepTask::new(state.db.clone(), state.sweeper.clone());
    tokio::spawn(sweep_task.run(shutdown.clone()));

    let handle = axum_server::Handle::new();
    tokio::spawn(shutdown_signal(handle.clone(), shutdown));

    info!("LAN Share server listening on http://{addr} (docs at /docs)");

    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .expect("HTTP server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for ctrl-c, then stop the sweep loop and drain the server.
async fn shutdown_signal(handle: axum_server::Handle<SocketAddr>, shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    info!("shutdown signal received");
    shutdown.cancel();
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
