// region:    --- Imports
use campus_auction::audit_log::{AuditLog, MemoryAuditLog, PostgresAuditLog};
use campus_auction::clock::{Clock, SystemClock};
use campus_auction::config::Config;
use campus_auction::database::DatabaseManager;
use campus_auction::handlers::{self, AppState};
use campus_auction::message_broker::KafkaManager;
use campus_auction::notifier::{KafkaNotifier, Notifier, TracingNotifier};
use campus_auction::store::{AuctionStore, MemoryAuctionStore, PostgresAuctionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    // 저장소 및 감사 로그 선택 (DATABASE_URL 이 없으면 메모리)
    let (store, audit): (Arc<dyn AuctionStore>, Arc<dyn AuditLog>) = match &config.database_url {
        Some(url) => {
            let db_manager =
                Arc::new(DatabaseManager::connect(url, config.database_max_connections).await?);
            if let Err(e) = db_manager.initialize_database().await {
                error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
                return Err(e.into());
            }
            info!("{:<12} --> 데이터베이스 초기화 성공", "Main");
            let store: Arc<dyn AuctionStore> =
                Arc::new(PostgresAuctionStore::new(Arc::clone(&db_manager)));
            let audit: Arc<dyn AuditLog> = Arc::new(PostgresAuditLog::new(db_manager));
            (store, audit)
        }
        None => {
            warn!(
                "{:<12} --> DATABASE_URL 이 없어 메모리 저장소를 사용합니다.",
                "Main"
            );
            let store: Arc<dyn AuctionStore> = Arc::new(MemoryAuctionStore::new());
            let audit: Arc<dyn AuditLog> = Arc::new(MemoryAuditLog::new());
            (store, audit)
        }
    };

    // 알림 전송 선택 (KAFKA_BROKERS 가 없으면 로그만 남김)
    let notifier: Arc<dyn Notifier> = match &config.kafka_brokers {
        Some(brokers) => {
            let kafka_manager = KafkaManager::new(brokers)?;
            if let Err(e) = kafka_manager
                .create_topic(&config.notification_topic, 3, 1)
                .await
            {
                warn!("{:<12} --> 알림 토픽 생성 생략: {}", "Main", e);
            }
            Arc::new(KafkaNotifier::new(
                kafka_manager.get_producer(),
                config.notification_topic.clone(),
            ))
        }
        None => {
            warn!(
                "{:<12} --> KAFKA_BROKERS 가 없어 알림을 로그로만 남깁니다.",
                "Main"
            );
            Arc::new(TracingNotifier)
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(store, audit, notifier, clock, &config);

    // 자동 종료 스케줄러 시작
    let scheduler = Arc::new(state.scheduler(&config)).start();

    let routes_all = handlers::router(state);

    // 리스너 생성
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행 (Ctrl-C 시 요청 처리 마무리 후 종료)
    if let Err(err) = axum::serve(
        listener,
        routes_all.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!("{:<12} --> Server error: {}", "Main", err);
    }

    scheduler.stop().await;
    info!("{:<12} --> 서버 종료", "Main");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("{:<12} --> 종료 시그널 수신 실패: {:?}", "Main", e);
    }
}
// endregion: --- Main
