// region:    --- Imports
use super::model::{BidRules, PlaceBidCommand};
use crate::auction::model::{Auction, AuctionStatus};
use crate::error::{AuctionError, BidRejection};
use chrono::{DateTime, Utc};

// endregion: --- Imports

/// 입찰 검증
/// 반드시 경매 행을 잠근 상태에서 방금 읽은 값으로 호출해야 한다.
pub fn validate_bid(
    auction: &Auction,
    cmd: &PlaceBidCommand,
    now: DateTime<Utc>,
    rules: &BidRules,
) -> Result<(), AuctionError> {
    let reject = |reason| AuctionError::BidRejected {
        reason,
        current_price: auction.current_price,
        status: auction.status,
    };

    if auction.status != AuctionStatus::Active {
        return Err(reject(BidRejection::NotActive));
    }

    if auction.seller_id == cmd.bidder_id {
        return Err(reject(BidRejection::SelfBid));
    }

    // 종료 1분 전부터 입찰 불가 (자동 종료와의 경합 방지)
    if let Some(left) = auction.time_left(now) {
        if left < rules.grace_window {
            return Err(reject(BidRejection::TooLate));
        }
    }

    if cmd.amount <= auction.current_price {
        return Err(reject(BidRejection::PriceTooLow));
    }

    Ok(())
}

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap()
    }

    fn active_auction() -> Auction {
        Auction {
            id: 1,
            title: "자전거".to_string(),
            description: String::new(),
            starting_price: 10000,
            current_price: 10000,
            seller_id: 10,
            category: None,
            images: vec![],
            status: AuctionStatus::Active,
            start_time: Some(t0()),
            end_time: Some(t0() + Duration::minutes(60)),
            duration_minutes: 60,
            is_hot: false,
            winning_bid_id: None,
            winner_id: None,
            final_price: None,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn bid(bidder_id: i64, amount: i64) -> PlaceBidCommand {
        PlaceBidCommand {
            auction_id: 1,
            bidder_id,
            amount,
        }
    }

    fn rejection(result: Result<(), AuctionError>) -> BidRejection {
        match result {
            Err(AuctionError::BidRejected { reason, .. }) => reason,
            other => panic!("expected bid rejection, got {:?}", other),
        }
    }

    #[test]
    fn accepts_higher_bid_on_active_auction() {
        let auction = active_auction();
        let now = t0() + Duration::minutes(1);
        assert!(validate_bid(&auction, &bid(20, 11000), now, &BidRules::default()).is_ok());
    }

    #[test]
    fn equal_or_lower_amount_is_rejected_with_current_price() {
        let mut auction = active_auction();
        auction.current_price = 11000;
        let now = t0() + Duration::minutes(2);

        for amount in [10500, 11000] {
            match validate_bid(&auction, &bid(20, amount), now, &BidRules::default()) {
                Err(err @ AuctionError::BidRejected { .. }) => {
                    assert_eq!(err.kind(), ErrorKind::InvalidState);
                    assert!(err.to_string().contains("11000"));
                    if let AuctionError::BidRejected {
                        reason,
                        current_price,
                        ..
                    } = err
                    {
                        assert_eq!(reason, BidRejection::PriceTooLow);
                        assert_eq!(current_price, 11000);
                    }
                }
                other => panic!("expected rejection, got {:?}", other),
            }
        }
    }

    #[test]
    fn seller_cannot_bid_on_own_auction() {
        let auction = active_auction();
        let now = t0() + Duration::minutes(1);
        let result = validate_bid(&auction, &bid(10, 50000), now, &BidRules::default());
        assert_eq!(rejection(result), BidRejection::SelfBid);
    }

    #[test]
    fn bids_inside_grace_window_are_rejected() {
        let auction = active_auction();
        let rules = BidRules::default();

        let just_outside = t0() + Duration::minutes(59);
        assert!(validate_bid(&auction, &bid(20, 11000), just_outside, &rules).is_ok());

        let inside = t0() + Duration::minutes(59) + Duration::seconds(1);
        let result = validate_bid(&auction, &bid(20, 11000), inside, &rules);
        assert_eq!(rejection(result), BidRejection::TooLate);

        let after_end = t0() + Duration::minutes(61);
        let result = validate_bid(&auction, &bid(20, 11000), after_end, &rules);
        assert_eq!(rejection(result), BidRejection::TooLate);
    }

    #[test]
    fn non_active_statuses_are_rejected() {
        for status in [
            AuctionStatus::Pending,
            AuctionStatus::Ended,
            AuctionStatus::Rejected,
        ] {
            let mut auction = active_auction();
            auction.status = status;
            let result = validate_bid(
                &auction,
                &bid(20, 99999),
                t0() + Duration::minutes(1),
                &BidRules::default(),
            );
            assert_eq!(rejection(result), BidRejection::NotActive);
        }
    }
}
// endregion: --- Tests
