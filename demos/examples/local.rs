//! Starts the mock greeter in-process and runs a short two-target ramp against it, with a
//! run plan read from JSON.
use anyhow::Result;
use mock_service::client::JsonRpcClient;
use stampede::prelude::*;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::FmtSubscriber;

const PLAN: &str = r#"{
    "stages": [
        { "duration": "1s", "target": 1 },
        { "duration": "10s", "target": 20 },
        { "duration": "5s", "target": 0 }
    ],
    "targets": [
        {
            "name": "client",
            "endpoint": "k8s:///127.0.0.1:3000",
            "group": "demoGrpcGroup",
            "checks": [{ "name": "status is OK", "assert": { "status": "OK" } }],
            "options": { "plaintext": true, "timeout": "2s" }
        },
        {
            "name": "client2",
            "endpoint": "k8s:///localhost:3000",
            "group": "demoGrpcGroup2",
            "checks": [
                { "name": "status2 is OK", "assert": { "status": "OK" } },
                { "name": "under 50ms", "assert": { "latency_below_ms": 50 } }
            ],
            "options": { "plaintext": true }
        }
    ],
    "sleep": "300ms",
    "summary_trend_stats": ["avg", "min", "med", "max", "p(90)", "p(95)"],
    "thresholds": {
        "rpc_req_duration": ["p(95)<500"],
        "checks": ["rate>0.99"]
    }
}"#;

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("stampede=debug,mock_service=info")
        .init();

    let addr: SocketAddr = "127.0.0.1:3000".parse()?;
    tokio::spawn(mock_service::run(addr));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let plan: RunPlan = serde_json::from_str(PLAN)?;
    let report = LoadTest::new(JsonRpcClient::new(), plan).await;

    println!("{report}");
    std::process::exit(report.exit_code());
}
