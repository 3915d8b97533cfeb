/// 경매 저장소
/// 경매와 입찰의 유일한 원본이며 모든 변경의 직렬화 지점이다.
/// 같은 경매에 대한 입찰과 상태 전이는 서로 배타적으로 실행되고,
/// 서로 다른 경매에 대한 작업은 병렬로 진행된다.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionDraft};
use crate::auth::UserProfile;
use crate::bidding::model::{BidReceipt, BidRules, PlaceBidCommand};
use crate::clock::Clock;
use crate::error::AuctionError;
use crate::lifecycle::transitions::{Transition, TransitionOutcome};
use crate::query::model::{AuctionDetail, AuctionFilter, AuctionSummary, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod memory;
pub mod postgres;

pub use memory::MemoryAuctionStore;
pub use postgres::PostgresAuctionStore;

// endregion: --- Imports

// region:    --- Auction Store Trait
#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// pending 상태로 경매 등록
    async fn create_auction(
        &self,
        draft: AuctionDraft,
        now: DateTime<Utc>,
    ) -> Result<Auction, AuctionError>;

    async fn get_auction(&self, auction_id: i64) -> Result<Auction, AuctionError>;

    async fn list_auctions(
        &self,
        filter: &AuctionFilter,
    ) -> Result<Vec<AuctionSummary>, AuctionError>;

    async fn auction_detail(&self, auction_id: i64) -> Result<AuctionDetail, AuctionError>;

    /// 경매 행을 잠근 채 입찰 검증, 입찰 기록, 현재 가격 갱신을 하나의 단위로 수행
    /// 입찰 시각은 잠금을 획득한 뒤 clock 에서 읽는다.
    async fn place_bid(
        &self,
        cmd: PlaceBidCommand,
        clock: Arc<dyn Clock>,
        rules: BidRules,
    ) -> Result<BidReceipt, AuctionError>;

    /// 경매 행을 잠근 채 상태 전이 가드 검사 및 적용
    async fn apply_transition(
        &self,
        auction_id: i64,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, AuctionError>;

    /// 핫한 경매 설정 시 다른 경매의 핫 플래그를 같은 단위 안에서 해제
    async fn set_hot(
        &self,
        auction_id: i64,
        is_hot: bool,
        now: DateTime<Utc>,
    ) -> Result<Auction, AuctionError>;

    /// 종료 시간이 지난 활성 경매 id 목록
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<i64>, AuctionError>;

    async fn user_profile(&self, user_id: i64) -> Result<Option<UserProfile>, AuctionError>;

    /// 등록, 입찰, 낙찰 경매 수
    async fn user_stats(&self, user_id: i64) -> Result<UserStats, AuctionError> {
        let count = |rows: Vec<AuctionSummary>| rows.len() as i64;
        Ok(UserStats {
            sales: count(self.list_auctions(&AuctionFilter::selling_by(user_id)).await?),
            bids: count(self.list_auctions(&AuctionFilter::bid_by(user_id)).await?),
            wins: count(self.list_auctions(&AuctionFilter::won_by(user_id)).await?),
        })
    }
}
// endregion: --- Auction Store Trait
