/// 경매 상태 머신
/// pending --approve--> active --expire/end--> ended
/// pending --reject--> rejected
/// active --delay--> active (종료 시간만 변경)
// region:    --- Imports
use crate::auction::events::CloseReason;
use crate::auction::model::{Auction, AuctionStatus, Winner};
use crate::auth::AuthContext;
use crate::bidding::model::Bid;
use crate::error::AuctionError;
use chrono::{DateTime, Duration, Utc};

// endregion: --- Imports

// region:    --- Transition
/// 상태 전이 요청
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    End { by: AuthContext },
    Expire,
    Delay { minutes: i64 },
}

impl Transition {
    pub fn label(&self) -> &'static str {
        match self {
            Transition::Approve => "승인",
            Transition::Reject => "거부",
            Transition::End { .. } => "종료",
            Transition::Expire => "자동 종료",
            Transition::Delay { .. } => "종료 지연",
        }
    }
}

/// 잠긴 경매 행에 적용할 변경 계획
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Planned {
    Activate {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
    Reject,
    Close {
        reason: CloseReason,
    },
    Extend {
        end_time: DateTime<Utc>,
    },
    // 이미 처리되었거나 아직 처리할 필요가 없음
    Unchanged,
}

/// 상태 전이 결과
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub before: Auction,
    pub after: Auction,
    pub applied: bool,
    pub close_reason: Option<CloseReason>,
}
// endregion: --- Transition

// region:    --- Planning
/// 가드 검사 후 변경 계획 산출
/// 가드 위반 시 아무 변경 없이 InvalidTransition 반환
pub fn plan_transition(
    auction: &Auction,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<Planned, AuctionError> {
    let invalid = || AuctionError::InvalidTransition {
        action: transition.label(),
        status: auction.status,
    };

    match (*transition, auction.status) {
        (Transition::Approve, AuctionStatus::Pending) => Ok(Planned::Activate {
            start_time: now,
            end_time: now + Duration::minutes(i64::from(auction.duration_minutes)),
        }),
        (Transition::Reject, AuctionStatus::Pending) => Ok(Planned::Reject),

        (Transition::End { by }, AuctionStatus::Active) => {
            if by.is_admin() {
                Ok(Planned::Close {
                    reason: CloseReason::AdminManualEnd,
                })
            } else if by.user_id == auction.seller_id {
                Ok(Planned::Close {
                    reason: CloseReason::ManualEnd,
                })
            } else {
                Err(AuctionError::Forbidden(
                    "경매를 종료할 권한이 없습니다.".to_string(),
                ))
            }
        }

        // 스케줄러가 같은 경매를 두 번 볼 수 있으므로 이미 종료된 경매는 무시
        (Transition::Expire, AuctionStatus::Ended) => Ok(Planned::Unchanged),
        (Transition::Expire, AuctionStatus::Active) => match auction.end_time {
            Some(end_time) if end_time <= now => Ok(Planned::Close {
                reason: CloseReason::AutoEnd,
            }),
            // 조회 이후 종료 시간이 연장된 경우
            _ => Ok(Planned::Unchanged),
        },

        (Transition::Delay { minutes }, AuctionStatus::Active) => {
            let invalid_minutes =
                || AuctionError::InvalidInput("유효한 시간을 입력해주세요.".to_string());
            if minutes < 1 {
                return Err(invalid_minutes());
            }
            // 표현 범위를 넘는 시간은 거부
            let end_time = Duration::try_minutes(minutes)
                .and_then(|delay| now.checked_add_signed(delay))
                .ok_or_else(invalid_minutes)?;
            Ok(Planned::Extend { end_time })
        }

        _ => Err(invalid()),
    }
}

/// 최고가 입찰 산출
/// 입찰가는 수락 순서대로 엄격히 증가하므로 최고가 입찰이 곧 마지막 입찰이다.
pub fn derive_winner(bids: &[Bid]) -> Option<Winner> {
    bids.iter()
        .max_by_key(|bid| (bid.amount, bid.id))
        .map(|bid| Winner {
            bid_id: bid.id,
            bidder_id: bid.bidder_id,
            amount: bid.amount,
        })
}

/// 변경 계획을 경매 스냅샷에 반영
/// 낙찰 정보는 종료 시점에 한 번만 기록된다.
pub fn apply_planned(
    auction: &mut Auction,
    planned: Planned,
    winner: Option<Winner>,
    now: DateTime<Utc>,
) {
    match planned {
        Planned::Activate {
            start_time,
            end_time,
        } => {
            auction.status = AuctionStatus::Active;
            auction.start_time = Some(start_time);
            auction.end_time = Some(end_time);
        }
        Planned::Reject => auction.status = AuctionStatus::Rejected,
        Planned::Close { .. } => {
            auction.status = AuctionStatus::Ended;
            auction.winning_bid_id = winner.map(|w| w.bid_id);
            auction.winner_id = winner.map(|w| w.bidder_id);
            auction.final_price = winner.map(|w| w.amount);
        }
        Planned::Extend { end_time } => auction.end_time = Some(end_time),
        Planned::Unchanged => return,
    }
    auction.updated_at = now;
}
// endregion: --- Planning

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::error::ErrorKind;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap()
    }

    fn auction(status: AuctionStatus) -> Auction {
        Auction {
            id: 5,
            title: "기타".to_string(),
            description: String::new(),
            starting_price: 10000,
            current_price: 10000,
            seller_id: 10,
            category: None,
            images: vec![],
            status,
            start_time: None,
            end_time: None,
            duration_minutes: 60,
            is_hot: false,
            winning_bid_id: None,
            winner_id: None,
            final_price: None,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn user(user_id: i64) -> AuthContext {
        AuthContext {
            user_id,
            role: Role::User,
        }
    }

    fn admin() -> AuthContext {
        AuthContext {
            user_id: 1,
            role: Role::Admin,
        }
    }

    #[test]
    fn approve_stamps_start_and_end_time() {
        let planned = plan_transition(&auction(AuctionStatus::Pending), &Transition::Approve, t0())
            .unwrap();
        assert_eq!(
            planned,
            Planned::Activate {
                start_time: t0(),
                end_time: t0() + Duration::minutes(60),
            }
        );
    }

    #[test]
    fn approve_and_reject_require_pending() {
        for status in [
            AuctionStatus::Active,
            AuctionStatus::Ended,
            AuctionStatus::Rejected,
        ] {
            for transition in [Transition::Approve, Transition::Reject] {
                let err = plan_transition(&auction(status), &transition, t0()).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::InvalidState);
            }
        }
    }

    #[test]
    fn end_requires_active_and_seller_or_admin() {
        let active = auction(AuctionStatus::Active);
        assert_eq!(
            plan_transition(&active, &Transition::End { by: user(10) }, t0()).unwrap(),
            Planned::Close {
                reason: CloseReason::ManualEnd
            }
        );
        assert_eq!(
            plan_transition(&active, &Transition::End { by: admin() }, t0()).unwrap(),
            Planned::Close {
                reason: CloseReason::AdminManualEnd
            }
        );
        let err = plan_transition(&active, &Transition::End { by: user(99) }, t0()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let pending = auction(AuctionStatus::Pending);
        let err = plan_transition(&pending, &Transition::End { by: admin() }, t0()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn expire_is_a_no_op_on_ended_and_unexpired_auctions() {
        let ended = auction(AuctionStatus::Ended);
        assert_eq!(
            plan_transition(&ended, &Transition::Expire, t0()).unwrap(),
            Planned::Unchanged
        );

        let mut extended = auction(AuctionStatus::Active);
        extended.end_time = Some(t0() + Duration::minutes(5));
        assert_eq!(
            plan_transition(&extended, &Transition::Expire, t0()).unwrap(),
            Planned::Unchanged
        );

        let mut expired = auction(AuctionStatus::Active);
        expired.end_time = Some(t0());
        assert_eq!(
            plan_transition(&expired, &Transition::Expire, t0()).unwrap(),
            Planned::Close {
                reason: CloseReason::AutoEnd
            }
        );

        let err = plan_transition(&auction(AuctionStatus::Rejected), &Transition::Expire, t0())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn delay_sets_end_time_from_now() {
        let mut active = auction(AuctionStatus::Active);
        active.end_time = Some(t0() + Duration::minutes(3));
        assert_eq!(
            plan_transition(&active, &Transition::Delay { minutes: 30 }, t0()).unwrap(),
            Planned::Extend {
                end_time: t0() + Duration::minutes(30)
            }
        );
        let err =
            plan_transition(&active, &Transition::Delay { minutes: 0 }, t0()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn delay_beyond_representable_time_is_invalid_input() {
        let active = auction(AuctionStatus::Active);
        for minutes in [1_000_000_000_000, i64::MAX] {
            let err = plan_transition(&active, &Transition::Delay { minutes }, t0()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn winner_is_highest_bid() {
        let bid = |id, bidder_id, amount| Bid {
            id,
            auction_id: 5,
            bidder_id,
            amount,
            created_at: t0(),
        };
        assert_eq!(derive_winner(&[]), None);
        let winner = derive_winner(&[bid(1, 20, 11000), bid(2, 21, 12000), bid(3, 22, 11500)])
            .unwrap();
        assert_eq!(winner.bidder_id, 21);
        assert_eq!(winner.amount, 12000);
    }

    #[test]
    fn closing_records_winner_once() {
        let mut active = auction(AuctionStatus::Active);
        let winner = Winner {
            bid_id: 3,
            bidder_id: 21,
            amount: 12000,
        };
        apply_planned(
            &mut active,
            Planned::Close {
                reason: CloseReason::AutoEnd,
            },
            Some(winner),
            t0(),
        );
        assert_eq!(active.status, AuctionStatus::Ended);
        assert_eq!(active.winner(), Some(winner));
    }
}
// endregion: --- Tests
