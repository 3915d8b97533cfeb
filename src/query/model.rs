use crate::auction::model::{Auction, AuctionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 목록 조회용 경매 요약
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuctionSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub auction: Auction,
    pub seller_name: Option<String>,
    pub bid_count: i64,
    pub participant_count: i64,
}

/// 입찰 내역 (입찰자 이름 포함)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BidView {
    pub id: i64,
    pub bidder_id: i64,
    pub bidder_name: Option<String>,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// 경매 상세 (입찰 내역은 높은 금액 순)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionDetail {
    #[serde(flatten)]
    pub summary: AuctionSummary,
    pub bids: Vec<BidView>,
}

/// 목록 정렬 기준
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuctionOrder {
    #[default]
    CreatedDesc,
    EndTimeDesc,
}

/// 사용자별 경매 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserStats {
    // 등록한 경매 수
    pub sales: i64,
    // 입찰한 경매 수 (경매 기준 중복 제거)
    pub bids: i64,
    // 낙찰받은 경매 수
    pub wins: i64,
}

/// 목록 조회 조건
#[derive(Debug, Clone, Default)]
pub struct AuctionFilter {
    pub status: Option<AuctionStatus>,
    pub hot_only: bool,
    pub seller_id: Option<i64>,
    // 해당 사용자의 입찰이 하나 이상 있는 경매
    pub bidder_id: Option<i64>,
    // 종료 시 확정된 낙찰자
    pub winner_id: Option<i64>,
    pub order: AuctionOrder,
    pub limit: Option<i64>,
}

impl AuctionFilter {
    pub fn active() -> Self {
        Self {
            status: Some(AuctionStatus::Active),
            ..Default::default()
        }
    }

    /// 최근 종료된 경매 20개
    pub fn recently_ended() -> Self {
        Self {
            status: Some(AuctionStatus::Ended),
            order: AuctionOrder::EndTimeDesc,
            limit: Some(20),
            ..Default::default()
        }
    }

    /// 진행 중인 핫한 경매
    pub fn hot() -> Self {
        Self {
            status: Some(AuctionStatus::Active),
            hot_only: true,
            limit: Some(1),
            ..Default::default()
        }
    }

    pub fn pending() -> Self {
        Self {
            status: Some(AuctionStatus::Pending),
            ..Default::default()
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    /// 사용자가 등록한 경매 (모든 상태)
    pub fn selling_by(user_id: i64) -> Self {
        Self {
            seller_id: Some(user_id),
            ..Default::default()
        }
    }

    /// 사용자가 입찰한 경매
    pub fn bid_by(user_id: i64) -> Self {
        Self {
            bidder_id: Some(user_id),
            ..Default::default()
        }
    }

    /// 사용자가 낙찰받은 경매 (저장된 낙찰자 기준)
    pub fn won_by(user_id: i64) -> Self {
        Self {
            status: Some(AuctionStatus::Ended),
            winner_id: Some(user_id),
            order: AuctionOrder::EndTimeDesc,
            ..Default::default()
        }
    }
}
