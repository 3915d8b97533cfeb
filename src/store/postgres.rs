/// PostgreSQL 경매 저장소
/// 입찰과 상태 전이는 모두 경매 행 잠금(SELECT ... FOR UPDATE)을 먼저 획득한 트랜잭션 안에서 처리
// region:    --- Imports
use super::AuctionStore;
use crate::auction::model::{Auction, AuctionDraft};
use crate::auth::{Role, UserProfile};
use crate::bidding::model::{Bid, BidReceipt, BidRules, PlaceBidCommand};
use crate::bidding::rules::validate_bid;
use crate::clock::Clock;
use crate::database::DatabaseManager;
use crate::error::AuctionError;
use crate::lifecycle::transitions::{
    apply_planned, derive_winner, plan_transition, Planned, Transition, TransitionOutcome,
};
use crate::query::model::{
    AuctionDetail, AuctionFilter, AuctionOrder, AuctionSummary, BidView, UserStats,
};
use crate::query::queries;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::{debug, info};

// endregion: --- Imports

// 핫한 경매 설정 advisory lock 키
const HOT_FLAG_LOCK_KEY: i64 = 7_401_001;

// region:    --- Rows
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    user_type: String,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = AuctionError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.user_type.parse::<Role>().map_err(AuctionError::Internal)?;
        Ok(UserProfile {
            id: row.id,
            username: row.username,
            email: row.email,
            role,
        })
    }
}
// endregion: --- Rows

// region:    --- Postgres Store
pub struct PostgresAuctionStore {
    db: Arc<DatabaseManager>,
}

impl PostgresAuctionStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    /// 요약 조회 쿼리 (필터 조건 바인딩)
    fn summary_query(filter: &AuctionFilter, auction_id: Option<i64>) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::<Postgres>::new(queries::select_auction_summaries());
        qb.push(" WHERE TRUE");
        if let Some(auction_id) = auction_id {
            qb.push(" AND a.id = ").push_bind(auction_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND a.status = ").push_bind(status.as_str());
        }
        if filter.hot_only {
            qb.push(" AND a.is_hot = TRUE");
        }
        if let Some(seller_id) = filter.seller_id {
            qb.push(" AND a.seller_id = ").push_bind(seller_id);
        }
        if let Some(bidder_id) = filter.bidder_id {
            qb.push(" AND EXISTS (SELECT 1 FROM bids mb WHERE mb.auction_id = a.id AND mb.bidder_id = ")
                .push_bind(bidder_id)
                .push(")");
        }
        if let Some(winner_id) = filter.winner_id {
            qb.push(" AND a.winner_id = ").push_bind(winner_id);
        }
        qb.push(queries::GROUP_AUCTION_SUMMARIES);
        qb.push(match filter.order {
            AuctionOrder::CreatedDesc => " ORDER BY a.created_at DESC, a.id DESC",
            AuctionOrder::EndTimeDesc => " ORDER BY a.end_time DESC",
        });
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        qb
    }
}

#[async_trait]
impl AuctionStore for PostgresAuctionStore {
    async fn create_auction(
        &self,
        draft: AuctionDraft,
        now: DateTime<Utc>,
    ) -> Result<Auction, AuctionError> {
        let auction = sqlx::query_as::<_, Auction>(queries::INSERT_AUCTION)
            .bind(draft.title)
            .bind(draft.description)
            .bind(draft.starting_price)
            .bind(draft.seller_id)
            .bind(draft.category)
            .bind(draft.images)
            .bind(draft.duration_minutes)
            .bind(now)
            .fetch_one(self.db.pool())
            .await?;
        debug!("{:<12} --> 경매 등록 id: {}", "Store", auction.id);
        Ok(auction)
    }

    async fn get_auction(&self, auction_id: i64) -> Result<Auction, AuctionError> {
        sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
            .bind(auction_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(AuctionError::AuctionNotFound(auction_id))
    }

    async fn list_auctions(
        &self,
        filter: &AuctionFilter,
    ) -> Result<Vec<AuctionSummary>, AuctionError> {
        let rows = Self::summary_query(filter, None)
            .build_query_as::<AuctionSummary>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    async fn auction_detail(&self, auction_id: i64) -> Result<AuctionDetail, AuctionError> {
        let summary = Self::summary_query(&AuctionFilter::all(), Some(auction_id))
            .build_query_as::<AuctionSummary>()
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(AuctionError::AuctionNotFound(auction_id))?;
        let bids = sqlx::query_as::<_, BidView>(queries::GET_BID_VIEWS)
            .bind(auction_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(AuctionDetail { summary, bids })
    }

    async fn place_bid(
        &self,
        cmd: PlaceBidCommand,
        clock: Arc<dyn Clock>,
        rules: BidRules,
    ) -> Result<BidReceipt, AuctionError> {
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let auction = sqlx::query_as::<_, Auction>(queries::LOCK_AUCTION)
                        .bind(cmd.auction_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .ok_or(AuctionError::AuctionNotFound(cmd.auction_id))?;

                    // 행 잠금 이후의 값과 시각으로 검증
                    let now = clock.now();
                    validate_bid(&auction, &cmd, now, &rules)?;

                    let bid_id: i64 = sqlx::query_scalar(queries::INSERT_BID)
                        .bind(cmd.auction_id)
                        .bind(cmd.bidder_id)
                        .bind(cmd.amount)
                        .bind(now)
                        .fetch_one(&mut **tx)
                        .await?;

                    let updated = sqlx::query(queries::UPDATE_CURRENT_PRICE)
                        .bind(cmd.auction_id)
                        .bind(cmd.amount)
                        .bind(now)
                        .execute(&mut **tx)
                        .await?;
                    if updated.rows_affected() != 1 {
                        return Err(AuctionError::Conflict);
                    }

                    let (bid_count, participant_count): (i64, i64) =
                        sqlx::query_as(queries::COUNT_BIDS)
                            .bind(cmd.auction_id)
                            .fetch_one(&mut **tx)
                            .await?;

                    Ok::<_, AuctionError>(BidReceipt {
                        bid_id,
                        previous_price: auction.current_price,
                        current_price: cmd.amount,
                        bid_count,
                        participant_count,
                        bid_time: now,
                    })
                })
            })
            .await
    }

    async fn apply_transition(
        &self,
        auction_id: i64,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, AuctionError> {
        self.db
            .transaction(move |tx| {
                Box::pin(async move {
                    let before = sqlx::query_as::<_, Auction>(queries::LOCK_AUCTION)
                        .bind(auction_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .ok_or(AuctionError::AuctionNotFound(auction_id))?;

                    let planned = plan_transition(&before, &transition, now)?;

                    let (winner, close_reason) = match planned {
                        Planned::Close { reason } => {
                            let highest = sqlx::query_as::<_, Bid>(queries::GET_HIGHEST_BID)
                                .bind(auction_id)
                                .fetch_optional(&mut **tx)
                                .await?;
                            (derive_winner(highest.as_slice()), Some(reason))
                        }
                        _ => (None, None),
                    };

                    match planned {
                        Planned::Activate {
                            start_time,
                            end_time,
                        } => {
                            sqlx::query(queries::ACTIVATE_AUCTION)
                                .bind(auction_id)
                                .bind(start_time)
                                .bind(end_time)
                                .bind(now)
                                .execute(&mut **tx)
                                .await?;
                        }
                        Planned::Reject => {
                            sqlx::query(queries::REJECT_AUCTION)
                                .bind(auction_id)
                                .bind(now)
                                .execute(&mut **tx)
                                .await?;
                        }
                        Planned::Close { .. } => {
                            sqlx::query(queries::CLOSE_AUCTION)
                                .bind(auction_id)
                                .bind(winner.map(|w| w.bid_id))
                                .bind(winner.map(|w| w.bidder_id))
                                .bind(winner.map(|w| w.amount))
                                .bind(now)
                                .execute(&mut **tx)
                                .await?;
                        }
                        Planned::Extend { end_time } => {
                            sqlx::query(queries::EXTEND_AUCTION)
                                .bind(auction_id)
                                .bind(end_time)
                                .bind(now)
                                .execute(&mut **tx)
                                .await?;
                        }
                        Planned::Unchanged => {}
                    }

                    let mut after = before.clone();
                    apply_planned(&mut after, planned, winner, now);

                    Ok::<_, AuctionError>(TransitionOutcome {
                        before,
                        after,
                        applied: planned != Planned::Unchanged,
                        close_reason,
                    })
                })
            })
            .await
    }

    async fn set_hot(
        &self,
        auction_id: i64,
        is_hot: bool,
        now: DateTime<Utc>,
    ) -> Result<Auction, AuctionError> {
        let auction = self
            .db
            .transaction(move |tx| {
                Box::pin(async move {
                    // 핫 플래그 변경은 전역으로 직렬화
                    sqlx::query(queries::LOCK_HOT_FLAG)
                        .bind(HOT_FLAG_LOCK_KEY)
                        .execute(&mut **tx)
                        .await?;

                    let mut auction = sqlx::query_as::<_, Auction>(queries::LOCK_AUCTION)
                        .bind(auction_id)
                        .fetch_optional(&mut **tx)
                        .await?
                        .ok_or(AuctionError::AuctionNotFound(auction_id))?;

                    if is_hot {
                        sqlx::query(queries::CLEAR_HOT_FLAGS)
                            .bind(auction_id)
                            .bind(now)
                            .execute(&mut **tx)
                            .await?;
                    }
                    sqlx::query(queries::SET_HOT_FLAG)
                        .bind(auction_id)
                        .bind(is_hot)
                        .bind(now)
                        .execute(&mut **tx)
                        .await?;

                    auction.is_hot = is_hot;
                    auction.updated_at = now;
                    Ok::<_, AuctionError>(auction)
                })
            })
            .await?;
        info!(
            "{:<12} --> 핫한 경매 변경 id: {}, is_hot: {}",
            "Store", auction_id, is_hot
        );
        Ok(auction)
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<i64>, AuctionError> {
        let ids = sqlx::query_scalar::<_, i64>(queries::GET_EXPIRED_AUCTIONS)
            .bind(now)
            .fetch_all(self.db.pool())
            .await?;
        Ok(ids)
    }

    async fn user_profile(&self, user_id: i64) -> Result<Option<UserProfile>, AuctionError> {
        sqlx::query_as::<_, UserRow>(queries::GET_USER_PROFILE)
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?
            .map(UserProfile::try_from)
            .transpose()
    }

    async fn user_stats(&self, user_id: i64) -> Result<UserStats, AuctionError> {
        let stats = sqlx::query_as::<_, UserStats>(queries::GET_USER_STATS)
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(stats)
    }
}
// endregion: --- Postgres Store
