use crate::app::services::CompanionServices;
use crate::web_bridge::model::{
    CurrentGpsPayload, DispatchResponse, ExportResponse, PointsPayload,
};
use anyhow::Context;
use log::{error, info, warn};
use rtcomcore::rangetest::DispatchRequest;
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::io::ErrorKind;
use std::net::SocketAddr;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

const MAX_COMMAND_BODY: usize = 16 * 1024;
const MAP_MISSING: &str = "Range test map not found. Start logging points first!";

/// Hosts the companion's HTTP endpoints on top of the shared services.
pub struct WebBridge {
    services: CompanionServices,
}

impl WebBridge {
    pub fn new(services: CompanionServices) -> Self {
        Self { services }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        routes(self.services.clone())
    }

    /// Binds and serves until `shutdown` resolves.
    pub async fn serve<S>(self, addr: SocketAddr, shutdown: S) -> anyhow::Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .with_context(|| format!("binding HTTP listener on {}", addr))?;
        info!("listening on http://{}", bound);
        server.await;
        Ok(())
    }
}

pub fn routes(
    services: CompanionServices,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let services_filter = warp::any().map(move || services.clone());

    let current_gps_route = warp::path!("api" / "current_gps")
        .and(warp::get())
        .and(services_filter.clone())
        .map(|services: CompanionServices| {
            warp::reply::json(&CurrentGpsPayload::from(services.live.read()))
        });

    let logged_points_route = warp::path!("api" / "logged_points")
        .and(warp::get())
        .and(services_filter.clone())
        .map(|services: CompanionServices| {
            warp::reply::json(&PointsPayload {
                points: services.points.read(),
            })
        });

    let map_route = warp::path!("map")
        .and(warp::get())
        .and(services_filter.clone())
        .and_then(serve_map);

    let export_route = warp::path!("api" / "export_map")
        .and(warp::post())
        .and(services_filter.clone())
        .and_then(export_map);

    let command_route = warp::path!("api" / "send_lxmf_command")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(services_filter)
        .and_then(send_command);

    current_gps_route
        .or(logged_points_route)
        .or(map_route)
        .or(export_route)
        .or(command_route)
        .with(warp::log("rtcom::http"))
        .recover(handle_rejection)
}

async fn serve_map(services: CompanionServices) -> Result<Response, Rejection> {
    let response = match tokio::fs::read(&services.map_file).await {
        Ok(html) => {
            warp::reply::with_header(html, "content-type", "text/html; charset=utf-8")
                .into_response()
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warp::reply::with_status(MAP_MISSING, StatusCode::NOT_FOUND).into_response()
        }
        Err(err) => {
            error!("reading {}: {}", services.map_file.display(), err);
            warp::reply::with_status(
                "Range test map could not be read",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response()
        }
    };
    Ok(response)
}

async fn export_map(services: CompanionServices) -> Result<impl Reply, Rejection> {
    let exporter = services.exporter.clone();
    let response = match tokio::task::spawn_blocking(move || exporter.export()).await {
        Ok(Ok(exported)) => ExportResponse::from(exported),
        Ok(Err(err)) => {
            warn!("map export failed: {}", err);
            ExportResponse::failed(err)
        }
        Err(err) => {
            error!("map export task failed: {}", err);
            ExportResponse::failed("Export failed")
        }
    };
    Ok(warp::reply::json(&response))
}

async fn send_command(body: Bytes, services: CompanionServices) -> Result<impl Reply, Rejection> {
    if body.len() > MAX_COMMAND_BODY {
        warn!("rejected command body of {} bytes", body.len());
        return Ok(warp::reply::json(&DispatchResponse::failed(
            "Request body too large",
        )));
    }

    // An empty body carries no fields; validation reports what is missing.
    let parsed = if body.iter().all(u8::is_ascii_whitespace) {
        Ok(DispatchRequest::default())
    } else {
        serde_json::from_slice::<DispatchRequest>(&body)
    };
    let request = match parsed {
        Ok(request) => request,
        Err(err) => {
            warn!("rejected command body: {}", err);
            return Ok(warp::reply::json(&DispatchResponse::failed(
                "Request body must be a JSON object",
            )));
        }
    };

    let response = match services.mailbox.dispatch(&request).await {
        Ok(line) => DispatchResponse::sent(line),
        Err(err) => {
            warn!("command not sent: {}", err);
            DispatchResponse::failed(err)
        }
    };
    Ok(warp::reply::json(&response))
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        error!("unhandled rejection: {:?}", rejection);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({"success": false, "error": message})),
        status,
    ))
}
