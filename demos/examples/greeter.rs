//! Ramps up to 50 virtual users against the greeter(s) named by `GRPC_SERVER` and
//! `GRPC_SERVER_2`. Ctrl-C ends the run early.
use anyhow::Result;
use mock_service::client::JsonRpcClient;
use stampede::core::RPC_REQ_DURATION;
use stampede::prelude::*;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("stampede=info")
        .init();

    let plan = RunPlan::new(&[
        Stage::new(Duration::from_secs(1), 1),
        Stage::new(Duration::from_secs(120), 50),
        Stage::new(Duration::from_secs(10), 0),
    ])
    .targets(TargetSettings::from_env()?.targets()?)
    .sleep(Duration::from_millis(300))
    .summary_trend_stats(&[
        Stat::Avg,
        Stat::Min,
        Stat::Med,
        Stat::Max,
        Stat::Percentile(90.),
        Stat::Percentile(95.),
        Stat::Percentile(99.),
        Stat::Count,
    ])
    .threshold(RPC_REQ_DURATION, "p(95)<500".parse()?)
    .threshold("checks", "rate>0.99".parse()?);

    let load_test = LoadTest::new(JsonRpcClient::new(), plan);
    let stop = load_test.stop_handle();
    let progress = load_test.progress();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
            stop.stop();
        }
    });

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            info!("{}", progress.current());
        }
    });

    let report = load_test.await;
    println!("{report}");
    std::process::exit(report.exit_code());
}
