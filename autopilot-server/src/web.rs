use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{debug, error, info};
use serde_json::{json, Value};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_graceful_shutdown::SubsystemHandle;

use autopilot_core::{AutopilotError, Command, DataStore, Delta};

use crate::service::{AutopilotHandle, ServiceError};
use crate::signalk::{url_to_path, SharedStore};
use crate::PLUGIN_ID;

// Plugin endpoints, mounted where a SignalK server mounts plugin routers
const COMMAND_URI: &str = "/plugins/nmea0183-autopilot/command";
const STATUS_URI: &str = "/plugins/nmea0183-autopilot/status";

// Minimal SignalK data API for standalone use
const DELTA_URI: &str = "/signalk/v1/api/delta";
const SELF_PATH_URI: &str = "/signalk/v1/api/vessels/self/{*path}";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Socket operation failed")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Autopilot(#[from] AutopilotError),
    #[error("{0}")]
    Service(#[from] ServiceError),
}

// Tell axum how to convert `WebError` into a response.
impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match self {
            WebError::Service(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Clone)]
pub struct Web {
    handle: AutopilotHandle,
    store: SharedStore,
}

impl Web {
    pub fn new(handle: AutopilotHandle, store: SharedStore) -> Self {
        Web { handle, store }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route(COMMAND_URI, post(post_command))
            .route(STATUS_URI, get(get_status))
            .route(DELTA_URI, post(post_delta))
            .route(SELF_PATH_URI, get(get_self_path))
            .with_state(self)
    }

    pub async fn run(self, subsys: SubsystemHandle, port: u16) -> Result<(), WebError> {
        let listener =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port))
                .await?;
        info!("Starting HTTP web server on port {}", port);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { subsys.on_shutdown_requested().await })
            .await?;
        Ok(())
    }
}

async fn post_command(
    State(state): State<Web>,
    Json(body): Json<Value>,
) -> Result<String, WebError> {
    debug!("command: {}", body);
    let result = match Command::from_json(body) {
        Ok(command) => state.handle.command(command).await?,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => Ok(format!("Executed command for plugin {}", PLUGIN_ID)),
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}

async fn get_status(State(state): State<Web>) -> Result<Response, WebError> {
    let status = state.handle.status().await?;
    Ok(Json(status).into_response())
}

async fn post_delta(State(state): State<Web>, Json(delta): Json<Delta>) -> Response {
    let applied = state.store.apply_delta(&delta);
    Json(json!({ "applied": applied })).into_response()
}

async fn get_self_path(State(state): State<Web>, Path(path): Path<String>) -> Response {
    let path = url_to_path(&path);
    match state.store.get(&path) {
        Some(value) => Json(json!({ "value": value })).into_response(),
        None => (StatusCode::NOT_FOUND, format!("No value at {}", path)).into_response(),
    }
}
