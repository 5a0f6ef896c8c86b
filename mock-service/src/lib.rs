//! A greeter service speaking JSON over HTTP, plus the matching [`RpcClient`].
//!
//! Methods are addressed as `POST /<service>/<method>` and answer with a `grpc-status` header
//! carrying the canonical status code.
use axum::{
    debug_handler,
    extract::Path,
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lazy_static::lazy_static;
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use stampede::core::Status;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

pub mod client;

pub const GREETER_SERVICE: &str = "helloworld.Greeter";

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(health))
        .route("/:service/:method", post(invoke))
        .route("/limited/:max_tps/:service/:method", post(limited))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct HelloRequest {
    #[serde(default)]
    pub name: String,
    /// Only honoured by `SayHelloSlow`.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HelloReply {
    pub message: String,
}

type Reply = (HeaderMap, Json<HelloReply>);

fn reply(status: Status, message: String) -> Reply {
    let mut headers = HeaderMap::new();
    headers.insert("grpc-status", HeaderValue::from(status.code()));
    (headers, Json(HelloReply { message }))
}

#[debug_handler]
pub async fn health() -> StatusCode {
    StatusCode::OK
}

#[debug_handler]
pub async fn invoke(
    Path((service, method)): Path<(String, String)>,
    Json(request): Json<HelloRequest>,
) -> Reply {
    counter!("mock-service.requests").increment(1);
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    greet(&service, &method, request).await
}

async fn greet(service: &str, method: &str, request: HelloRequest) -> Reply {
    if service != GREETER_SERVICE {
        debug!("Unknown service {service}");
        return reply(Status::Unimplemented, format!("unknown service {service}"));
    }

    match method {
        "SayHello" => reply(Status::Ok, format!("Hello {}", request.name)),
        "SayHelloSlow" => {
            let delay = Duration::from_millis(request.delay_ms.unwrap_or(50));
            tokio::time::sleep(delay).await;
            reply(Status::Ok, format!("Hello {}", request.name))
        }
        _ => reply(Status::Unimplemented, format!("unknown method {method}")),
    }
}

lazy_static! {
    static ref LIMITED_MAP: Arc<RwLock<HashMap<u32, Arc<DefaultDirectRateLimiter>>>> =
        Arc::new(RwLock::new(HashMap::new()));
}

/// Like [`invoke`], but answers `RESOURCE_EXHAUSTED` above `max_tps`.
#[debug_handler]
pub async fn limited(
    Path((max_tps, service, method)): Path<(u32, String, String)>,
    Json(request): Json<HelloRequest>,
) -> Result<Reply, StatusCode> {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    let max_tps = NonZeroU32::new(max_tps).ok_or(StatusCode::BAD_REQUEST)?;

    let read = LIMITED_MAP
        .read()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .get(&max_tps.get())
        .cloned();
    let limiter = match read {
        Some(limiter) => limiter,
        None => LIMITED_MAP
            .write()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .entry(max_tps.get())
            .or_insert_with(|| Arc::new(rate_limiter(max_tps)))
            .clone(),
    };

    if limiter.check().is_err() {
        counter!("mock-service.exhausted").increment(1);
        return Ok(reply(
            Status::ResourceExhausted,
            format!("more than {max_tps} requests per second"),
        ));
    }

    Ok(greet(&service, &method, request).await)
}

/** Utils **/

pub fn rate_limiter(tps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps))
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = TPS_MEASURE.fetch_min(0, Ordering::Relaxed);
        println!("{transactions} TPS");
        gauge!("mock-service.tps").set(transactions as f64);
    }
}
