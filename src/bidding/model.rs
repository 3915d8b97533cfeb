use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 입찰 모델 (생성 후 변경되지 않음)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
}

/// 입찰 성공 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidReceipt {
    pub bid_id: i64,
    pub previous_price: i64,
    pub current_price: i64,
    pub bid_count: i64,
    pub participant_count: i64,
    pub bid_time: DateTime<Utc>,
}

/// 입찰 규칙
#[derive(Debug, Clone, Copy)]
pub struct BidRules {
    /// 종료 직전 입찰 금지 구간
    pub grace_window: chrono::Duration,
}

impl Default for BidRules {
    fn default() -> Self {
        Self {
            grace_window: chrono::Duration::seconds(60),
        }
    }
}
