/// 메모리 경매 저장소
/// DATABASE_URL 이 없는 개발 환경과 테스트에서 사용
/// 경매별 Mutex 로 단일 작성자 규칙을 지키며, 잠금 순서는 hot -> users -> 경매 레코드
// region:    --- Imports
use super::AuctionStore;
use crate::auction::model::{Auction, AuctionDraft, AuctionStatus};
use crate::auth::UserProfile;
use crate::bidding::model::{Bid, BidReceipt, BidRules, PlaceBidCommand};
use crate::bidding::rules::validate_bid;
use crate::clock::Clock;
use crate::error::AuctionError;
use crate::lifecycle::transitions::{
    apply_planned, derive_winner, plan_transition, Planned, Transition, TransitionOutcome,
};
use crate::query::model::{AuctionDetail, AuctionFilter, AuctionOrder, AuctionSummary, BidView};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

// endregion: --- Imports

// region:    --- Lock Helpers
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
// endregion: --- Lock Helpers

// region:    --- Memory Store
/// 경매 한 건과 그 입찰 내역
#[derive(Debug)]
struct AuctionRecord {
    auction: Auction,
    bids: Vec<Bid>,
}

impl AuctionRecord {
    fn summary(&self, users: &HashMap<i64, UserProfile>) -> AuctionSummary {
        let participants: HashSet<i64> = self.bids.iter().map(|bid| bid.bidder_id).collect();
        AuctionSummary {
            auction: self.auction.clone(),
            seller_name: users
                .get(&self.auction.seller_id)
                .map(|user| user.username.clone()),
            bid_count: self.bids.len() as i64,
            participant_count: participants.len() as i64,
        }
    }
}

pub struct MemoryAuctionStore {
    auctions: RwLock<BTreeMap<i64, Arc<Mutex<AuctionRecord>>>>,
    // 현재 핫한 경매 id (설정 변경과 목록 조회를 직렬화)
    hot: RwLock<Option<i64>>,
    users: RwLock<HashMap<i64, UserProfile>>,
    next_auction_id: AtomicI64,
    next_bid_id: AtomicI64,
}

impl Default for MemoryAuctionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuctionStore {
    pub fn new() -> Self {
        Self {
            auctions: RwLock::new(BTreeMap::new()),
            hot: RwLock::new(None),
            users: RwLock::new(HashMap::new()),
            next_auction_id: AtomicI64::new(1),
            next_bid_id: AtomicI64::new(1),
        }
    }

    /// 사용자 디렉터리 등록 (회원 관리는 외부 서비스 담당)
    pub fn insert_user(&self, profile: UserProfile) {
        write(&self.users).insert(profile.id, profile);
    }

    fn record(&self, auction_id: i64) -> Result<Arc<Mutex<AuctionRecord>>, AuctionError> {
        read(&self.auctions)
            .get(&auction_id)
            .cloned()
            .ok_or(AuctionError::AuctionNotFound(auction_id))
    }

    fn matches(record: &AuctionRecord, filter: &AuctionFilter) -> bool {
        let auction = &record.auction;
        filter.status.map_or(true, |status| auction.status == status)
            && (!filter.hot_only || auction.is_hot)
            && filter.seller_id.map_or(true, |id| auction.seller_id == id)
            && filter
                .bidder_id
                .map_or(true, |id| record.bids.iter().any(|bid| bid.bidder_id == id))
            && filter.winner_id.map_or(true, |id| auction.winner_id == Some(id))
    }
}

#[async_trait]
impl AuctionStore for MemoryAuctionStore {
    async fn create_auction(
        &self,
        draft: AuctionDraft,
        now: DateTime<Utc>,
    ) -> Result<Auction, AuctionError> {
        let id = self.next_auction_id.fetch_add(1, Ordering::SeqCst);
        let auction = Auction {
            id,
            title: draft.title,
            description: draft.description,
            starting_price: draft.starting_price,
            current_price: draft.starting_price,
            seller_id: draft.seller_id,
            category: draft.category,
            images: draft.images,
            status: AuctionStatus::Pending,
            start_time: None,
            end_time: None,
            duration_minutes: draft.duration_minutes,
            is_hot: false,
            winning_bid_id: None,
            winner_id: None,
            final_price: None,
            created_at: now,
            updated_at: now,
        };
        let record = AuctionRecord {
            auction: auction.clone(),
            bids: Vec::new(),
        };
        write(&self.auctions).insert(id, Arc::new(Mutex::new(record)));
        debug!("{:<12} --> 경매 등록 id: {}", "Store", id);
        Ok(auction)
    }

    async fn get_auction(&self, auction_id: i64) -> Result<Auction, AuctionError> {
        let record = self.record(auction_id)?;
        let auction = lock(&record).auction.clone();
        Ok(auction)
    }

    async fn list_auctions(
        &self,
        filter: &AuctionFilter,
    ) -> Result<Vec<AuctionSummary>, AuctionError> {
        let _hot = read(&self.hot);
        let records: Vec<_> = read(&self.auctions).values().cloned().collect();
        let users = read(&self.users);

        let mut rows: Vec<AuctionSummary> = records
            .iter()
            .filter_map(|record| {
                let record = lock(record);
                Self::matches(&record, filter).then(|| record.summary(&users))
            })
            .collect();

        match filter.order {
            AuctionOrder::CreatedDesc => rows.sort_by(|a, b| {
                (b.auction.created_at, b.auction.id).cmp(&(a.auction.created_at, a.auction.id))
            }),
            AuctionOrder::EndTimeDesc => rows.sort_by(|a, b| b.auction.end_time.cmp(&a.auction.end_time)),
        }
        if let Some(limit) = filter.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(rows)
    }

    async fn auction_detail(&self, auction_id: i64) -> Result<AuctionDetail, AuctionError> {
        let users = read(&self.users);
        let record = self.record(auction_id)?;
        let record = lock(&record);

        let mut bids: Vec<BidView> = record
            .bids
            .iter()
            .map(|bid| BidView {
                id: bid.id,
                bidder_id: bid.bidder_id,
                bidder_name: users.get(&bid.bidder_id).map(|u| u.username.clone()),
                amount: bid.amount,
                created_at: bid.created_at,
            })
            .collect();
        bids.sort_by(|a, b| b.amount.cmp(&a.amount));

        Ok(AuctionDetail {
            summary: record.summary(&users),
            bids,
        })
    }

    async fn place_bid(
        &self,
        cmd: PlaceBidCommand,
        clock: Arc<dyn Clock>,
        rules: BidRules,
    ) -> Result<BidReceipt, AuctionError> {
        let record = self.record(cmd.auction_id)?;
        let mut record = lock(&record);
        let now = clock.now();

        // 잠금 안에서 검증과 기록을 함께 수행
        validate_bid(&record.auction, &cmd, now, &rules)?;

        let bid_id = self.next_bid_id.fetch_add(1, Ordering::SeqCst);
        let previous_price = record.auction.current_price;
        record.bids.push(Bid {
            id: bid_id,
            auction_id: cmd.auction_id,
            bidder_id: cmd.bidder_id,
            amount: cmd.amount,
            created_at: now,
        });
        record.auction.current_price = cmd.amount;
        record.auction.updated_at = now;

        let participants: HashSet<i64> = record.bids.iter().map(|bid| bid.bidder_id).collect();
        Ok(BidReceipt {
            bid_id,
            previous_price,
            current_price: cmd.amount,
            bid_count: record.bids.len() as i64,
            participant_count: participants.len() as i64,
            bid_time: now,
        })
    }

    async fn apply_transition(
        &self,
        auction_id: i64,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, AuctionError> {
        let record = self.record(auction_id)?;
        let mut record = lock(&record);

        let planned = plan_transition(&record.auction, &transition, now)?;
        let before = record.auction.clone();
        let (winner, close_reason) = match planned {
            Planned::Close { reason } => (derive_winner(&record.bids), Some(reason)),
            _ => (None, None),
        };
        apply_planned(&mut record.auction, planned, winner, now);

        Ok(TransitionOutcome {
            before,
            after: record.auction.clone(),
            applied: planned != Planned::Unchanged,
            close_reason,
        })
    }

    async fn set_hot(
        &self,
        auction_id: i64,
        is_hot: bool,
        now: DateTime<Utc>,
    ) -> Result<Auction, AuctionError> {
        let mut hot = write(&self.hot);
        let record = self.record(auction_id)?;

        if is_hot {
            // 기존 핫한 경매 해제 후 설정
            if let Some(previous) = hot.filter(|previous| *previous != auction_id) {
                if let Ok(previous) = self.record(previous) {
                    let mut previous = lock(&previous);
                    previous.auction.is_hot = false;
                    previous.auction.updated_at = now;
                }
            }
            *hot = Some(auction_id);
        } else if *hot == Some(auction_id) {
            *hot = None;
        }

        let mut record = lock(&record);
        record.auction.is_hot = is_hot;
        record.auction.updated_at = now;
        Ok(record.auction.clone())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<i64>, AuctionError> {
        let records: Vec<_> = read(&self.auctions).values().cloned().collect();
        let mut expired: Vec<(DateTime<Utc>, i64)> = records
            .iter()
            .filter_map(|record| {
                let record = lock(record);
                match (record.auction.status, record.auction.end_time) {
                    (AuctionStatus::Active, Some(end_time)) if end_time <= now => {
                        Some((end_time, record.auction.id))
                    }
                    _ => None,
                }
            })
            .collect();
        expired.sort();
        Ok(expired.into_iter().map(|(_, id)| id).collect())
    }

    async fn user_profile(&self, user_id: i64) -> Result<Option<UserProfile>, AuctionError> {
        Ok(read(&self.users).get(&user_id).cloned())
    }
}
// endregion: --- Memory Store

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthContext, Role};
    use crate::clock::ManualClock;
    use crate::error::{BidRejection, ErrorKind};
    use crate::query::model::UserStats;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap()
    }

    fn at(now: DateTime<Utc>) -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(now))
    }

    fn draft(seller_id: i64) -> AuctionDraft {
        AuctionDraft {
            title: "모니터".to_string(),
            description: "27인치".to_string(),
            starting_price: 10000,
            seller_id,
            category: Some("전자기기".to_string()),
            images: vec![],
            duration_minutes: 60,
        }
    }

    async fn active_auction(store: &MemoryAuctionStore) -> Auction {
        let auction = store.create_auction(draft(10), t0()).await.unwrap();
        store
            .apply_transition(auction.id, Transition::Approve, t0())
            .await
            .unwrap()
            .after
    }

    fn bid(auction_id: i64, bidder_id: i64, amount: i64) -> PlaceBidCommand {
        PlaceBidCommand {
            auction_id,
            bidder_id,
            amount,
        }
    }

    #[tokio::test]
    async fn accepted_bid_updates_price_and_counts_together() {
        let store = MemoryAuctionStore::new();
        let auction = active_auction(&store).await;
        let now = t0() + Duration::minutes(1);

        let first = store
            .place_bid(bid(auction.id, 20, 11000), at(now), BidRules::default())
            .await
            .unwrap();
        let second = store
            .place_bid(bid(auction.id, 20, 12000), at(now), BidRules::default())
            .await
            .unwrap();
        let third = store
            .place_bid(bid(auction.id, 21, 13000), at(now), BidRules::default())
            .await
            .unwrap();

        assert_eq!(first.previous_price, 10000);
        assert_eq!(second.bid_count, 2);
        assert_eq!(second.participant_count, 1);
        assert_eq!(third.bid_count, 3);
        assert_eq!(third.participant_count, 2);
        assert_eq!(store.get_auction(auction.id).await.unwrap().current_price, 13000);
    }

    #[tokio::test]
    async fn rejected_bid_leaves_no_trace() {
        let store = MemoryAuctionStore::new();
        let auction = active_auction(&store).await;
        let now = t0() + Duration::minutes(1);

        let err = store
            .place_bid(bid(auction.id, 20, 9000), at(now), BidRules::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuctionError::BidRejected {
                reason: BidRejection::PriceTooLow,
                current_price: 10000,
                ..
            }
        ));

        let detail = store.auction_detail(auction.id).await.unwrap();
        assert!(detail.bids.is_empty());
        assert_eq!(detail.summary.auction.current_price, 10000);
    }

    #[tokio::test]
    async fn unknown_auction_is_not_found() {
        let store = MemoryAuctionStore::new();
        let err = store
            .place_bid(bid(42, 20, 11000), at(t0()), BidRules::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn concurrent_bids_never_lower_the_price() {
        let store = Arc::new(MemoryAuctionStore::new());
        let auction = active_auction(&store).await;
        let now = t0() + Duration::minutes(1);

        let mut handles = Vec::new();
        for i in 1..=50_i64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .place_bid(bid(auction.id, 100 + i, 10000 + i * 100), at(now), BidRules::default())
                    .await
                    .map(|receipt| receipt.current_price)
            }));
        }

        let mut accepted = Vec::new();
        for handle in handles {
            if let Ok(price) = handle.await.unwrap() {
                accepted.push(price);
            }
        }

        let detail = store.auction_detail(auction.id).await.unwrap();
        let highest_accepted = accepted.iter().copied().max().unwrap();
        assert_eq!(detail.summary.auction.current_price, highest_accepted);
        assert_eq!(detail.bids.len(), accepted.len());

        // 기록 순서대로 가격이 엄격히 증가
        let mut by_id: Vec<_> = detail.bids.iter().collect();
        by_id.sort_by_key(|bid| bid.id);
        assert!(by_id.windows(2).all(|pair| pair[0].amount < pair[1].amount));
    }

    #[tokio::test]
    async fn only_one_auction_is_hot() {
        let store = MemoryAuctionStore::new();
        let a = active_auction(&store).await;
        let b = active_auction(&store).await;

        store.set_hot(a.id, true, t0()).await.unwrap();
        store.set_hot(b.id, true, t0()).await.unwrap();

        let hot: Vec<_> = store
            .list_auctions(&AuctionFilter::all())
            .await
            .unwrap()
            .into_iter()
            .filter(|row| row.auction.is_hot)
            .map(|row| row.auction.id)
            .collect();
        assert_eq!(hot, vec![b.id]);

        store.set_hot(b.id, false, t0()).await.unwrap();
        assert!(store
            .list_auctions(&AuctionFilter::hot())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn close_fixes_winner_and_expired_query_skips_ended() {
        let store = MemoryAuctionStore::new();
        let auction = active_auction(&store).await;
        store
            .place_bid(
                bid(auction.id, 20, 11000),
                at(t0() + Duration::minutes(1)),
                BidRules::default(),
            )
            .await
            .unwrap();

        let later = t0() + Duration::minutes(61);
        assert_eq!(store.find_expired(later).await.unwrap(), vec![auction.id]);

        let outcome = store
            .apply_transition(auction.id, Transition::Expire, later)
            .await
            .unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.after.winner_id, Some(20));
        assert_eq!(outcome.after.final_price, Some(11000));
        assert!(store.find_expired(later).await.unwrap().is_empty());

        let again = store
            .apply_transition(auction.id, Transition::Expire, later)
            .await
            .unwrap();
        assert!(!again.applied);
        assert_eq!(again.after, outcome.after);
    }

    #[tokio::test]
    async fn user_views_follow_seller_bidder_and_stored_winner() {
        let store = MemoryAuctionStore::new();
        let closed = active_auction(&store).await;
        let open = active_auction(&store).await;
        let now = t0() + Duration::minutes(1);
        for (auction_id, bidder_id, amount) in [
            (closed.id, 20, 11000),
            (closed.id, 21, 12000),
            (open.id, 20, 15000),
        ] {
            store
                .place_bid(bid(auction_id, bidder_id, amount), at(now), BidRules::default())
                .await
                .unwrap();
        }
        let seller = AuthContext {
            user_id: 10,
            role: Role::User,
        };
        store
            .apply_transition(closed.id, Transition::End { by: seller }, now)
            .await
            .unwrap();

        async fn ids(store: &MemoryAuctionStore, filter: AuctionFilter) -> Vec<i64> {
            let mut ids: Vec<i64> = store
                .list_auctions(&filter)
                .await
                .unwrap()
                .into_iter()
                .map(|row| row.auction.id)
                .collect();
            ids.sort();
            ids
        }

        assert_eq!(ids(&store, AuctionFilter::selling_by(10)).await, vec![closed.id, open.id]);
        assert_eq!(ids(&store, AuctionFilter::bid_by(20)).await, vec![closed.id, open.id]);
        assert_eq!(ids(&store, AuctionFilter::bid_by(21)).await, vec![closed.id]);
        // 진행 중인 경매의 최고가 입찰자는 낙찰자가 아니다
        assert!(ids(&store, AuctionFilter::won_by(20)).await.is_empty());
        assert_eq!(ids(&store, AuctionFilter::won_by(21)).await, vec![closed.id]);

        let stats = store.user_stats(20).await.unwrap();
        assert_eq!(
            stats,
            UserStats {
                sales: 0,
                bids: 2,
                wins: 0
            }
        );
        assert_eq!(store.user_stats(21).await.unwrap().wins, 1);
        assert_eq!(store.user_stats(10).await.unwrap().sales, 2);
    }

    #[tokio::test]
    async fn seller_can_end_but_others_cannot() {
        let store = MemoryAuctionStore::new();
        let auction = active_auction(&store).await;
        let stranger = AuthContext {
            user_id: 77,
            role: Role::User,
        };
        let err = store
            .apply_transition(auction.id, Transition::End { by: stranger }, t0())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(
            store.get_auction(auction.id).await.unwrap().status,
            AuctionStatus::Active
        );

        let seller = AuthContext {
            user_id: 10,
            role: Role::User,
        };
        let outcome = store
            .apply_transition(auction.id, Transition::End { by: seller }, t0())
            .await
            .unwrap();
        assert_eq!(outcome.after.status, AuctionStatus::Ended);
        assert_eq!(outcome.after.winner(), None);
    }
}
// endregion: --- Tests
