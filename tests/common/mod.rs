#![allow(dead_code)]

use reqwest::header::AUTHORIZATION;
use campus_auction::audit_log::MemoryAuditLog;
use campus_auction::auth::{Claims, Role, UserProfile};
use campus_auction::clock::ManualClock;
use campus_auction::config::Config;
use campus_auction::handlers::{self, AppState};
use campus_auction::notifier::{Notification, Notifier};
use campus_auction::scheduler::AuctionScheduler;
use campus_auction::store::MemoryAuctionStore;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const ADMIN: i64 = 1;
pub const SELLER: i64 = 10;
pub const BIDDER: i64 = 20;
pub const OTHER_BIDDER: i64 = 21;

/// 테스트 시작 시각
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap()
}

/// 발송된 알림을 채널로 수집
struct ChannelNotifier(mpsc::UnboundedSender<Notification>);

#[async_trait::async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), String> {
        self.0.send(notification).map_err(|e| e.to_string())
    }
}

pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryAuctionStore>,
    pub scheduler: Arc<AuctionScheduler>,
    inbox: Mutex<mpsc::UnboundedReceiver<Notification>>,
}

/// 메모리 저장소 + 수동 시계로 서버 실행 (임의 포트)
pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryAuctionStore::new());
    store.insert_user(profile(ADMIN, "관리자", Role::Admin));
    store.insert_user(profile(SELLER, "판매자", Role::User));
    for id in 20..30 {
        store.insert_user(profile(id, &format!("입찰자{}", id), Role::User));
    }

    let clock = Arc::new(ManualClock::new(t0()));
    let (tx, inbox) = mpsc::unbounded_channel();
    let config = Config {
        jwt_secret: JWT_SECRET.to_string(),
        ..Config::default()
    };

    let state = AppState::new(
        store.clone(),
        Arc::new(MemoryAuditLog::new()),
        Arc::new(ChannelNotifier(tx)),
        clock.clone(),
        &config,
    );
    let scheduler = Arc::new(state.scheduler(&config));
    let router = handlers::router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        client: Client::new(),
        clock,
        store,
        scheduler,
        inbox: Mutex::new(inbox),
    }
}

fn profile(id: i64, username: &str, role: Role) -> UserProfile {
    UserProfile {
        id,
        username: username.to_string(),
        email: format!("user{}@school.ac.kr", id),
        role,
    }
}

/// 토큰 발급 (실제 발급은 외부 인증 서비스 담당)
pub fn token(user_id: i64) -> String {
    let claims = Claims {
        user_id,
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str, user_id: Option<i64>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(user_id) = user_id {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token(user_id)));
        }
        request.send().await.expect("Failed to send request")
    }

    pub async fn post(&self, path: &str, user_id: i64, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .header(AUTHORIZATION, format!("Bearer {}", token(user_id)))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// 경매 등록 후 관리자 승인까지 (현재 시계 기준)
    pub async fn create_active_auction(&self, starting_price: i64, duration: &str) -> i64 {
        let response = self
            .post(
                "/api/auctions",
                SELLER,
                json!({
                    "title": "테스트 경매",
                    "description": "통합 테스트용 경매입니다.",
                    "starting_price": starting_price,
                    "duration": duration,
                }),
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let auction: Value = response.json().await.unwrap();
        let auction_id = auction["id"].as_i64().unwrap();

        let response = self
            .post(&format!("/api/auctions/{}/approve", auction_id), ADMIN, json!({}))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        auction_id
    }

    pub async fn bid(&self, auction_id: i64, bidder_id: i64, amount: i64) -> Response {
        self.post(
            &format!("/api/auctions/{}/bid", auction_id),
            bidder_id,
            json!({ "amount": amount }),
        )
        .await
    }

    pub async fn detail(&self, auction_id: i64) -> Value {
        self.get(&format!("/api/auctions/{}", auction_id), None)
            .await
            .json()
            .await
            .unwrap()
    }

    /// 백그라운드 알림 태스크가 끝나길 잠시 기다린 뒤 수집
    pub async fn drain_notifications(&self) -> Vec<Notification> {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let mut inbox = self.inbox.lock().await;
        let mut received = Vec::new();
        while let Ok(notification) = inbox.try_recv() {
            received.push(notification);
        }
        received
    }
}
