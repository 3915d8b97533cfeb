/// 경매 컬럼 목록
const AUCTION_COLUMNS: &str = "a.id, a.title, a.description, a.starting_price, a.current_price, a.seller_id, a.category, a.images, a.status, a.start_time, a.end_time, a.duration_minutes, a.is_hot, a.winning_bid_id, a.winner_id, a.final_price, a.created_at, a.updated_at";

/// 경매 등록
pub const INSERT_AUCTION: &str = r#"
    INSERT INTO auctions (title, description, starting_price, current_price, seller_id, category, images, status, duration_minutes, created_at, updated_at)
    VALUES ($1, $2, $3, $3, $4, $5, $6, 'pending', $7, $8, $8)
    RETURNING id, title, description, starting_price, current_price, seller_id, category, images, status, start_time, end_time, duration_minutes, is_hot, winning_bid_id, winner_id, final_price, created_at, updated_at
"#;

/// 경매 조회
pub const GET_AUCTION: &str = r#"
    SELECT a.id, a.title, a.description, a.starting_price, a.current_price, a.seller_id, a.category, a.images, a.status, a.start_time, a.end_time, a.duration_minutes, a.is_hot, a.winning_bid_id, a.winner_id, a.final_price, a.created_at, a.updated_at
    FROM auctions a
    WHERE a.id = $1
"#;

/// 경매 조회 + 행 잠금 (입찰, 상태 전이는 모두 이 잠금을 먼저 획득)
pub const LOCK_AUCTION: &str = r#"
    SELECT a.id, a.title, a.description, a.starting_price, a.current_price, a.seller_id, a.category, a.images, a.status, a.start_time, a.end_time, a.duration_minutes, a.is_hot, a.winning_bid_id, a.winner_id, a.final_price, a.created_at, a.updated_at
    FROM auctions a
    WHERE a.id = $1
    FOR UPDATE
"#;

/// 입찰 기록 추가
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (auction_id, bidder_id, amount, created_at)
    VALUES ($1, $2, $3, $4)
    RETURNING id
"#;

/// 현재 가격 갱신 (가격은 증가만 허용)
pub const UPDATE_CURRENT_PRICE: &str = r#"
    UPDATE auctions SET current_price = $2, updated_at = $3
    WHERE id = $1 AND current_price < $2
"#;

/// 입찰 수 및 참여자 수 조회
pub const COUNT_BIDS: &str = r#"
    SELECT COUNT(*) AS bid_count, COUNT(DISTINCT bidder_id) AS participant_count
    FROM bids
    WHERE auction_id = $1
"#;

/// 최고가 입찰 조회
pub const GET_HIGHEST_BID: &str = r#"
    SELECT id, auction_id, bidder_id, amount, created_at
    FROM bids
    WHERE auction_id = $1
    ORDER BY amount DESC, id DESC
    LIMIT 1
"#;

/// 승인: 상태, 시작/종료 시간 기록
pub const ACTIVATE_AUCTION: &str = r#"
    UPDATE auctions SET status = 'active', start_time = $2, end_time = $3, updated_at = $4
    WHERE id = $1
"#;

/// 거부
pub const REJECT_AUCTION: &str = r#"
    UPDATE auctions SET status = 'rejected', updated_at = $2
    WHERE id = $1
"#;

/// 종료: 낙찰 정보 확정
pub const CLOSE_AUCTION: &str = r#"
    UPDATE auctions SET status = 'ended', winning_bid_id = $2, winner_id = $3, final_price = $4, updated_at = $5
    WHERE id = $1
"#;

/// 종료 시간 변경
pub const EXTEND_AUCTION: &str = r#"
    UPDATE auctions SET end_time = $2, updated_at = $3
    WHERE id = $1
"#;

/// 핫한 경매 설정 직렬화용 advisory lock
pub const LOCK_HOT_FLAG: &str = "SELECT pg_advisory_xact_lock($1)";

/// 기존 핫한 경매 해제
pub const CLEAR_HOT_FLAGS: &str = r#"
    UPDATE auctions SET is_hot = FALSE, updated_at = $2
    WHERE is_hot = TRUE AND id <> $1
"#;

/// 핫한 경매 설정/해제
pub const SET_HOT_FLAG: &str = r#"
    UPDATE auctions SET is_hot = $2, updated_at = $3
    WHERE id = $1
"#;

/// 종료 시간이 지난 활성 경매 조회
pub const GET_EXPIRED_AUCTIONS: &str = r#"
    SELECT id FROM auctions
    WHERE status = 'active' AND end_time <= $1
    ORDER BY end_time ASC
"#;

/// 경매 요약 조회 (조건은 QueryBuilder 로 바인딩)
pub fn select_auction_summaries() -> String {
    format!(
        "SELECT {AUCTION_COLUMNS}, u.username AS seller_name, \
         COUNT(b.id) AS bid_count, COUNT(DISTINCT b.bidder_id) AS participant_count \
         FROM auctions a \
         LEFT JOIN users u ON a.seller_id = u.id \
         LEFT JOIN bids b ON a.id = b.auction_id"
    )
}

/// 요약 집계용 GROUP BY
pub const GROUP_AUCTION_SUMMARIES: &str = " GROUP BY a.id, u.username";

/// 입찰 내역 조회 (높은 금액 순)
pub const GET_BID_VIEWS: &str = r#"
    SELECT b.id, b.bidder_id, u.username AS bidder_name, b.amount, b.created_at
    FROM bids b
    LEFT JOIN users u ON b.bidder_id = u.id
    WHERE b.auction_id = $1
    ORDER BY b.amount DESC
"#;

/// 사용자별 경매 통계 (낙찰은 종료 시 확정된 winner_id 기준)
pub const GET_USER_STATS: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM auctions WHERE seller_id = $1) AS sales,
        (SELECT COUNT(DISTINCT auction_id) FROM bids WHERE bidder_id = $1) AS bids,
        (SELECT COUNT(*) FROM auctions WHERE status = 'ended' AND winner_id = $1) AS wins
"#;

/// 사용자 조회
pub const GET_USER_PROFILE: &str =
    "SELECT id, username, email, user_type FROM users WHERE id = $1";

/// 감사 로그 기록
pub const INSERT_AUDIT_LOG: &str = r#"
    INSERT INTO auction_logs (auction_id, user_id, action, details, ip_address, user_agent, timestamp)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

/// 감사 로그 조회 (조건은 QueryBuilder 로 바인딩)
pub const SELECT_AUDIT_LOGS: &str = r#"
    SELECT l.id, l.auction_id, l.user_id, u.username, a.title AS auction_title, l.action, l.details, l.ip_address, l.user_agent, l.timestamp
    FROM auction_logs l
    LEFT JOIN users u ON l.user_id = u.id
    LEFT JOIN auctions a ON l.auction_id = a.id
"#;
