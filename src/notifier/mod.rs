/// 알림 게이트웨이
/// 메일/푸시 발송은 외부 워커 담당. 여기서는 커밋 이후 한 번만 시도하고 결과를 기다리지 않는다.
// region:    --- Imports
use crate::auth::UserProfile;
use crate::message_broker::KafkaProducer;
use crate::store::AuctionStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- Notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    // 낙찰 알림
    Win {
        email: String,
        username: String,
        auction_title: String,
        amount: i64,
        auction_id: i64,
    },
    // 경매 승인 알림
    Approval {
        email: String,
        username: String,
        auction_title: String,
        auction_id: i64,
    },
    // 판매자용 종료 알림 (입찰이 없으면 final_price 없음)
    AuctionEnded {
        email: String,
        username: String,
        auction_title: String,
        auction_id: i64,
        final_price: Option<i64>,
    },
    // 핫한 경매 선정 알림
    Hot {
        email: String,
        username: String,
        auction_title: String,
        auction_id: i64,
    },
}

impl Notification {
    pub fn auction_id(&self) -> i64 {
        match self {
            Notification::Win { auction_id, .. }
            | Notification::Approval { auction_id, .. }
            | Notification::AuctionEnded { auction_id, .. }
            | Notification::Hot { auction_id, .. } => *auction_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Win { .. } => "win",
            Notification::Approval { .. } => "approval",
            Notification::AuctionEnded { .. } => "auction_ended",
            Notification::Hot { .. } => "hot",
        }
    }
}
// endregion: --- Notification

// region:    --- Notifier Trait
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), String>;
}

/// Kafka 토픽으로 알림 발행 (key = 경매 id)
pub struct KafkaNotifier {
    producer: Arc<KafkaProducer>,
    topic: String,
}

impl KafkaNotifier {
    pub fn new(producer: Arc<KafkaProducer>, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl Notifier for KafkaNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), String> {
        let payload = serde_json::to_string(&notification).map_err(|e| e.to_string())?;
        self.producer
            .send_message(
                &self.topic,
                &notification.auction_id().to_string(),
                &payload,
            )
            .await
    }
}

/// 브로커가 없을 때 알림을 로그로만 남김
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), String> {
        info!(
            "{:<12} --> 알림({}) 경매 id: {} {:?}",
            "Notifier",
            notification.kind(),
            notification.auction_id(),
            notification
        );
        Ok(())
    }
}
// endregion: --- Notifier Trait

// region:    --- Notification Gateway
/// 사용자 조회 + 알림 발송을 백그라운드 태스크로 처리
#[derive(Clone)]
pub struct NotificationGateway {
    directory: Arc<dyn AuctionStore>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationGateway {
    pub fn new(directory: Arc<dyn AuctionStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            directory,
            notifier,
        }
    }

    /// 수신자 조회 후 알림 발송 (fire-and-forget)
    pub fn send_to<F>(&self, user_id: i64, build: F) -> JoinHandle<()>
    where
        F: FnOnce(UserProfile) -> Notification + Send + 'static,
    {
        let directory = Arc::clone(&self.directory);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let profile = match directory.user_profile(user_id).await {
                Ok(Some(profile)) => profile,
                Ok(None) => {
                    warn!(
                        "{:<12} --> 알림 수신자를 찾을 수 없음 user_id: {}",
                        "Notifier", user_id
                    );
                    return;
                }
                Err(e) => {
                    error!("{:<12} --> 알림 수신자 조회 실패: {:?}", "Notifier", e);
                    return;
                }
            };

            let notification = build(profile);
            let kind = notification.kind();
            if let Err(e) = notifier.notify(notification).await {
                error!(
                    "{:<12} --> 알림({}) 발송 실패 user_id: {}, {}",
                    "Notifier", kind, user_id, e
                );
            }
        })
    }
}
// endregion: --- Notification Gateway

// endregion: --- Tests
