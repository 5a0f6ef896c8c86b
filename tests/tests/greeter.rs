mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use mock_service::client::JsonRpcClient;
    use stampede::core::{RPC_REQ_DURATION, RUN_FAILED_EXIT_CODE, THRESHOLDS_FAILED_EXIT_CODE};
    use stampede::prelude::*;
    use stampede::RunError;
    use std::collections::HashMap;
    use std::time::Duration;

    fn stages() -> [Stage; 3] {
        [
            Stage::new(Duration::from_secs(1), 1),
            Stage::new(Duration::from_secs(5), 10),
            Stage::new(Duration::from_secs(2), 0),
        ]
    }

    fn settings(vars: &[(&str, &str)]) -> TargetSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TargetSettings::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    fn local_targets() -> Vec<Target> {
        settings(&[
            ("GRPC_SERVER", MOCK_HOST),
            ("GRPC_PORT", &MOCK_PORT.to_string()),
        ])
        .targets()
        .unwrap()
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn service_outlives_first_runtime() {
        // Initialize from a runtime that is dropped before any run starts.
        std::thread::spawn(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(init());
        })
        .join()
        .unwrap();
        init().await;

        let plan = RunPlan::new(&[Stage::new(Duration::from_secs(1), 2)])
            .targets(local_targets())
            .sleep(Duration::from_millis(100));
        let report = LoadTest::new(JsonRpcClient::new(), plan).await;

        assert!(report.passed(), "{report}");
        assert!(report.counters.connects_ok > 0);
        assert!(report.counters.invocations > 0);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn greeter_ramp() {
        init().await;

        let plan = RunPlan::new(&stages())
            .targets(local_targets())
            .sleep(Duration::from_millis(300))
            .threshold(RPC_REQ_DURATION, "p(95)<500".parse().unwrap())
            .threshold("checks", "rate>0.99".parse().unwrap());

        let report = LoadTest::new(JsonRpcClient::new(), plan).await;
        println!("{report}");

        assert!(report.passed(), "{report}");
        let status = report.checks.get("status is OK").unwrap();
        assert!(status.passes > 0);
        assert_eq!(status.fails, 0);
        assert_eq!(report.live_at_end, 0);
        assert_eq!(report.vus_max, 10);
        assert_eq!(
            report.counters.connections_opened,
            report.counters.connections_closed
        );
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn two_servers_from_env() {
        init().await;

        let port = MOCK_PORT.to_string();
        let targets = settings(&[
            ("GRPC_SERVER", MOCK_HOST),
            ("GRPC_SERVER_2", "localhost"),
            ("GRPC_PORT", &port),
        ])
        .targets()
        .unwrap();
        assert_eq!(targets.len(), 2);

        let plan = RunPlan::new(&stages())
            .targets(targets)
            .sleep(Duration::from_millis(300));
        let report = LoadTest::new(JsonRpcClient::new(), plan).await;

        assert!(report.passed(), "{report}");
        assert_eq!(report.checks.len(), 2);
        let first = report.checks.get("status is OK").unwrap();
        let second = report.checks.get("status2 is OK").unwrap();
        assert_eq!(first.passes, second.passes);
        assert_eq!(report.counters.invocations, 2 * report.counters.iterations);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn unreachable_server() {
        init().await;

        let targets = settings(&[("GRPC_SERVER", MOCK_HOST), ("GRPC_PORT", "1")])
            .targets()
            .unwrap();
        let plan = RunPlan::new(&[Stage::new(Duration::from_secs(3), 5)]).targets(targets);

        let report = LoadTest::new(JsonRpcClient::new(), plan).await;

        assert!(matches!(report.error, Some(RunError::Unreachable { .. })));
        assert_eq!(report.exit_code(), RUN_FAILED_EXIT_CODE);
        assert_eq!(report.counters.invocations, 0);
        assert!(report.checks.is_empty());
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn rate_limited_server_crosses_thresholds() {
        init().await;

        let targets = local_targets()
            .into_iter()
            .map(|mut t| {
                t.method = "limited/20/helloworld.Greeter/SayHello".to_string();
                t
            })
            .collect::<Vec<_>>();
        let plan = RunPlan::new(&[
            Stage::new(Duration::ZERO, 10),
            Stage::new(Duration::from_secs(3), 10),
        ])
        .targets(targets)
        .threshold("checks", "rate>0.99".parse().unwrap());

        let report = LoadTest::new(JsonRpcClient::new(), plan).await;

        assert!(report.error.is_none(), "{report}");
        assert!(report.checks.get("status is OK").unwrap().fails > 0);
        assert!(!report.thresholds_passed());
        assert_eq!(report.exit_code(), THRESHOLDS_FAILED_EXIT_CODE);
    }

    #[tokio::test]
    #[ntest::timeout(30_000)]
    async fn slow_method_latency() {
        init().await;

        let targets = local_targets()
            .into_iter()
            .map(|mut t| {
                t.method = "helloworld.Greeter/SayHelloSlow".to_string();
                t.check(Check::new("greeting", Assertion::MessageContains("Hello".into())))
            })
            .collect::<Vec<_>>();
        let plan = RunPlan::new(&[
            Stage::new(Duration::ZERO, 2),
            Stage::new(Duration::from_secs(2), 2),
        ])
        .targets(targets)
        .threshold(RPC_REQ_DURATION, "min>=50".parse().unwrap());

        let report = LoadTest::new(JsonRpcClient::new(), plan)
            .payload(|info| {
                serde_json::json!({
                    "name": format!("VU={} Iter={}", info.vu, info.iteration),
                    "delay_ms": 60,
                })
            })
            .await;

        assert!(report.passed(), "{report}");
        assert_eq!(report.checks.get("greeting").unwrap().fails, 0);
    }
}
