use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

pub const MOCK_HOST: &str = "127.0.0.1";
pub const MOCK_PORT: u16 = 3002;

#[allow(unused)]
pub async fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    let wait = ONCE_LOCK.get().is_none();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
            std::process::exit(1);
        }));

        FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("stampede=debug,mock_service=debug,axum::rejection=trace")
            .init();

        PrometheusBuilder::new()
            .with_http_listener("0.0.0.0:8002".parse::<SocketAddr>().unwrap())
            .install()
            .unwrap();

        // NOTE: Each test has its own runtime; the service must outlive whichever test starts it.
        std::thread::spawn(|| {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            let addr: SocketAddr = format!("0.0.0.0:{MOCK_PORT}").parse().unwrap();
            if let Err(err) = runtime.block_on(mock_service::run(addr)) {
                error!("Mock service failed: {err}");
            }
        });
    });

    if wait {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect((MOCK_HOST, MOCK_PORT))
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
