/// 경매 생명주기 관리
/// 등록, 승인, 거부, 종료, 자동 종료, 종료 지연, 핫한 경매 설정
/// 상태 전이는 저장소 잠금 안에서 적용하고, 감사 로그와 알림은 커밋 이후 처리한다.
// region:    --- Imports
use super::transitions::{Transition, TransitionOutcome};
use crate::audit_log::{AuditEntry, AuditLog};
use crate::auction::events::AuctionEvent;
use crate::auction::model::{Auction, NewAuction};
use crate::auth::{AuthContext, RequestMeta};
use crate::clock::Clock;
use crate::error::AuctionError;
use crate::notifier::{Notification, NotificationGateway};
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Lifecycle Manager
pub struct LifecycleManager {
    store: Arc<dyn AuctionStore>,
    audit: Arc<dyn AuditLog>,
    notifications: NotificationGateway,
    clock: Arc<dyn Clock>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        audit: Arc<dyn AuditLog>,
        notifications: NotificationGateway,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            audit,
            notifications,
            clock,
        }
    }

    /// 경매 등록 (pending)
    pub async fn create(
        &self,
        ctx: &AuthContext,
        req: NewAuction,
        meta: &RequestMeta,
    ) -> Result<Auction, AuctionError> {
        let draft = req.validate(ctx.user_id).map_err(AuctionError::InvalidInput)?;
        let now = self.clock.now();
        let auction = self.store.create_auction(draft, now).await?;
        info!(
            "{:<12} --> 경매 등록 id: {}, seller: {}",
            "Lifecycle", auction.id, ctx.user_id
        );

        let event = AuctionEvent::Created {
            title: auction.title.clone(),
            category: auction.category.clone(),
            starting_price: auction.starting_price,
            duration_minutes: auction.duration_minutes,
        };
        self.record(auction.id, Some(ctx.user_id), &event, meta, now)
            .await;
        Ok(auction)
    }

    /// 승인 (관리자): pending -> active, 판매자에게 승인 알림
    pub async fn approve(
        &self,
        ctx: &AuthContext,
        auction_id: i64,
        meta: &RequestMeta,
    ) -> Result<Auction, AuctionError> {
        ctx.require_admin()?;
        let outcome = self
            .transition(auction_id, Transition::Approve, Some(ctx.user_id), meta)
            .await?;
        let auction = outcome.after;

        let title = auction.title.clone();
        self.notifications
            .send_to(auction.seller_id, move |seller| Notification::Approval {
                email: seller.email,
                username: seller.username,
                auction_title: title,
                auction_id,
            });
        Ok(auction)
    }

    /// 거부 (관리자): pending -> rejected
    pub async fn reject(
        &self,
        ctx: &AuthContext,
        auction_id: i64,
        meta: &RequestMeta,
    ) -> Result<Auction, AuctionError> {
        ctx.require_admin()?;
        let outcome = self
            .transition(auction_id, Transition::Reject, Some(ctx.user_id), meta)
            .await?;
        Ok(outcome.after)
    }

    /// 종료 (판매자 또는 관리자): active -> ended
    pub async fn end(
        &self,
        ctx: &AuthContext,
        auction_id: i64,
        meta: &RequestMeta,
    ) -> Result<Auction, AuctionError> {
        let outcome = self
            .transition(
                auction_id,
                Transition::End { by: *ctx },
                Some(ctx.user_id),
                meta,
            )
            .await?;
        self.announce_close(&outcome.after);
        Ok(outcome.after)
    }

    /// 자동 종료 (스케줄러)
    /// 이미 종료된 경매는 아무것도 하지 않고 false 반환
    pub async fn expire(&self, auction_id: i64) -> Result<bool, AuctionError> {
        let outcome = self
            .transition(
                auction_id,
                Transition::Expire,
                None,
                &RequestMeta::default(),
            )
            .await?;
        if outcome.applied {
            self.announce_close(&outcome.after);
        }
        Ok(outcome.applied)
    }

    /// 종료 지연 (관리자): 종료 시간 = 현재 + minutes
    pub async fn delay(
        &self,
        ctx: &AuthContext,
        auction_id: i64,
        minutes: i64,
        meta: &RequestMeta,
    ) -> Result<Auction, AuctionError> {
        ctx.require_admin()?;
        let outcome = self
            .transition(
                auction_id,
                Transition::Delay { minutes },
                Some(ctx.user_id),
                meta,
            )
            .await?;
        Ok(outcome.after)
    }

    /// 핫한 경매 설정/해제 (관리자)
    pub async fn set_hot(
        &self,
        ctx: &AuthContext,
        auction_id: i64,
        is_hot: bool,
        meta: &RequestMeta,
    ) -> Result<Auction, AuctionError> {
        ctx.require_admin()?;
        let now = self.clock.now();
        let auction = self.store.set_hot(auction_id, is_hot, now).await?;
        info!(
            "{:<12} --> 핫한 경매 {} id: {}",
            "Lifecycle",
            if is_hot { "설정" } else { "해제" },
            auction_id
        );

        let event = AuctionEvent::HotChanged {
            auction_title: auction.title.clone(),
            is_hot,
        };
        self.record(auction_id, Some(ctx.user_id), &event, meta, now)
            .await;

        if is_hot {
            let title = auction.title.clone();
            self.notifications
                .send_to(auction.seller_id, move |seller| Notification::Hot {
                    email: seller.email,
                    username: seller.username,
                    auction_title: title,
                    auction_id,
                });
        }
        Ok(auction)
    }

    /// 상태 전이 적용 + 감사 로그
    async fn transition(
        &self,
        auction_id: i64,
        transition: Transition,
        user_id: Option<i64>,
        meta: &RequestMeta,
    ) -> Result<TransitionOutcome, AuctionError> {
        let now = self.clock.now();
        let outcome = self
            .store
            .apply_transition(auction_id, transition, now)
            .await
            .map_err(|e| {
                debug!(
                    "{:<12} --> {} 실패 id: {}, {}",
                    "Lifecycle",
                    transition.label(),
                    auction_id,
                    e
                );
                e
            })?;

        if !outcome.applied {
            debug!(
                "{:<12} --> {} 생략 (변경 없음) id: {}",
                "Lifecycle",
                transition.label(),
                auction_id
            );
            return Ok(outcome);
        }

        info!(
            "{:<12} --> {} 완료 id: {}, {} -> {}",
            "Lifecycle",
            transition.label(),
            auction_id,
            outcome.before.status,
            outcome.after.status
        );

        if let Some(event) = Self::event_for(&transition, &outcome) {
            self.record(auction_id, user_id, &event, meta, now).await;
        }
        Ok(outcome)
    }

    fn event_for(transition: &Transition, outcome: &TransitionOutcome) -> Option<AuctionEvent> {
        let after = &outcome.after;
        match *transition {
            Transition::Approve => Some(AuctionEvent::Approved {
                start_time: after.start_time?,
                end_time: after.end_time?,
                duration_minutes: after.duration_minutes,
            }),
            Transition::Reject => Some(AuctionEvent::Rejected {
                title: after.title.clone(),
            }),
            Transition::End { .. } | Transition::Expire => Some(AuctionEvent::Ended {
                reason: outcome.close_reason?,
                final_price: after.final_price.unwrap_or(after.current_price),
                winner_id: after.winner_id,
                winning_bid_id: after.winning_bid_id,
            }),
            Transition::Delay { minutes } => Some(AuctionEvent::DelayedEnd {
                delay_minutes: minutes,
                original_end_time: outcome.before.end_time,
                new_end_time: after.end_time?,
            }),
        }
    }

    /// 종료 알림: 낙찰자에게 낙찰 알림, 판매자에게 종료 알림
    fn announce_close(&self, auction: &Auction) {
        let winner = auction.winner();
        if let Some(winner) = winner {
            let title = auction.title.clone();
            let auction_id = auction.id;
            self.notifications
                .send_to(winner.bidder_id, move |user| Notification::Win {
                    email: user.email,
                    username: user.username,
                    auction_title: title,
                    amount: winner.amount,
                    auction_id,
                });
        }

        let title = auction.title.clone();
        let auction_id = auction.id;
        self.notifications
            .send_to(auction.seller_id, move |seller| Notification::AuctionEnded {
                email: seller.email,
                username: seller.username,
                auction_title: title,
                auction_id,
                final_price: winner.map(|w| w.amount),
            });
    }

    async fn record(
        &self,
        auction_id: i64,
        user_id: Option<i64>,
        event: &AuctionEvent,
        meta: &RequestMeta,
        now: DateTime<Utc>,
    ) {
        let entry = AuditEntry::new(auction_id, user_id, event, meta, now);
        if let Err(e) = self.audit.record(entry).await {
            error!(
                "{:<12} --> 감사 로그 기록 실패 ({}) id: {}, {:?}",
                "Audit",
                event.action(),
                auction_id,
                e
            );
        }
    }
}
// endregion: --- Lifecycle Manager

// endregion: --- Tests
