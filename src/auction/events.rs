use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 경매 종료 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    // 판매자 직접 종료
    ManualEnd,
    // 관리자 종료
    AdminManualEnd,
    // 스케줄러 자동 종료
    AutoEnd,
}

/// 감사 로그에 기록되는 경매 이벤트
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum AuctionEvent {
    // 경매 등록 이벤트
    Created {
        title: String,
        category: Option<String>,
        starting_price: i64,
        duration_minutes: i32,
    },
    // 입찰 이벤트
    BidPlaced {
        bid_id: i64,
        amount: i64,
        previous_price: i64,
        new_price: i64,
    },
    // 승인 이벤트
    Approved {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        duration_minutes: i32,
    },
    // 거부 이벤트
    Rejected { title: String },
    // 종료 이벤트
    Ended {
        reason: CloseReason,
        final_price: i64,
        winner_id: Option<i64>,
        winning_bid_id: Option<i64>,
    },
    // 종료 지연 이벤트
    DelayedEnd {
        delay_minutes: i64,
        original_end_time: Option<DateTime<Utc>>,
        new_end_time: DateTime<Utc>,
    },
    // 핫한 경매 설정/해제 이벤트
    HotChanged { auction_title: String, is_hot: bool },
}

impl AuctionEvent {
    /// 감사 로그 action 이름
    pub fn action(&self) -> &'static str {
        match self {
            AuctionEvent::Created { .. } => "created",
            AuctionEvent::BidPlaced { .. } => "bid_placed",
            AuctionEvent::Approved { .. } => "approved",
            AuctionEvent::Rejected { .. } => "rejected",
            AuctionEvent::Ended { .. } => "ended",
            AuctionEvent::DelayedEnd { .. } => "delayed_end",
            AuctionEvent::HotChanged { is_hot: true, .. } => "set_hot",
            AuctionEvent::HotChanged { is_hot: false, .. } => "unset_hot",
        }
    }

    /// 감사 로그 details 필드
    pub fn details(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
