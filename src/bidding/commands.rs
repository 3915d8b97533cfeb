/// 입찰 커맨드 처리
/// 검증, 입찰 기록, 현재 가격 갱신은 저장소의 경매 잠금 안에서 하나의 단위로 처리되고,
/// 감사 로그는 커밋 이후에 기록된다.
// region:    --- Imports
use super::model::{BidReceipt, BidRules, PlaceBidCommand};
use crate::audit_log::{AuditEntry, AuditLog};
use crate::auction::events::AuctionEvent;
use crate::auth::{AuthContext, RequestMeta};
use crate::clock::Clock;
use crate::error::{AuctionError, BidRejection};
use crate::store::AuctionStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- Bid Engine
pub struct BidEngine {
    store: Arc<dyn AuctionStore>,
    audit: Arc<dyn AuditLog>,
    clock: Arc<dyn Clock>,
    rules: BidRules,
    // 커밋 전 제한 시간 (초과 시 트랜잭션 롤백)
    timeout: Duration,
}

impl BidEngine {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        audit: Arc<dyn AuditLog>,
        clock: Arc<dyn Clock>,
        rules: BidRules,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            audit,
            clock,
            rules,
            timeout,
        }
    }

    /// 입찰
    pub async fn place_bid(
        &self,
        ctx: &AuthContext,
        auction_id: i64,
        amount: i64,
        meta: &RequestMeta,
    ) -> Result<BidReceipt, AuctionError> {
        if amount <= 0 {
            return Err(AuctionError::InvalidInput(
                "유효한 입찰 금액을 입력해주세요.".to_string(),
            ));
        }

        let cmd = PlaceBidCommand {
            auction_id,
            bidder_id: ctx.user_id,
            amount,
        };
        let bid = self
            .store
            .place_bid(cmd, Arc::clone(&self.clock), self.rules);

        let result = tokio::time::timeout(self.timeout, bid)
            .await
            .map_err(|_| {
                warn!(
                    "{:<12} --> 입찰 처리 시간 초과 auction: {}, bidder: {}",
                    "Command", auction_id, ctx.user_id
                );
                AuctionError::Timeout
            })?;

        let receipt = match result {
            Ok(receipt) => receipt,
            // 동시 입찰 경합에서 진 경우 확정된 가격으로 다시 안내
            Err(AuctionError::Conflict) => return Err(self.lost_race(auction_id).await),
            Err(e) => {
                info!(
                    "{:<12} --> 입찰 거부 auction: {}, bidder: {}, amount: {}, {}",
                    "Command", auction_id, ctx.user_id, amount, e
                );
                return Err(e);
            }
        };

        info!(
            "{:<12} --> 입찰 성공 auction: {}, bidder: {}, {} -> {}",
            "Command", auction_id, ctx.user_id, receipt.previous_price, receipt.current_price
        );

        let event = AuctionEvent::BidPlaced {
            bid_id: receipt.bid_id,
            amount,
            previous_price: receipt.previous_price,
            new_price: receipt.current_price,
        };
        let entry = AuditEntry::new(auction_id, Some(ctx.user_id), &event, meta, receipt.bid_time);
        if let Err(e) = self.audit.record(entry).await {
            error!("{:<12} --> 입찰 감사 로그 기록 실패: {:?}", "Audit", e);
        }

        Ok(receipt)
    }

    async fn lost_race(&self, auction_id: i64) -> AuctionError {
        match self.store.get_auction(auction_id).await {
            Ok(auction) => {
                warn!(
                    "{:<12} --> 동시 입찰 충돌 auction: {}, 현재 가격: {}",
                    "Command", auction_id, auction.current_price
                );
                AuctionError::BidRejected {
                    reason: BidRejection::PriceTooLow,
                    current_price: auction.current_price,
                    status: auction.status,
                }
            }
            Err(e) => e,
        }
    }
}
// endregion: --- Bid Engine

// endregion: --- Tests
