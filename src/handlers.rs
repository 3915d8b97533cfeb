// region:    --- Imports
use crate::audit_log::{AuditLog, AuditQuery, AuditRecord};
use crate::auction::model::{Auction, NewAuction};
use crate::auth::{AuthContext, Authenticator, JwtAuthenticator, RequestMeta};
use crate::bidding::commands::BidEngine;
use crate::bidding::model::{BidReceipt, BidRules};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::AuctionError;
use crate::lifecycle::manager::LifecycleManager;
use crate::notifier::{NotificationGateway, Notifier};
use crate::query::model::{AuctionDetail, AuctionFilter, AuctionSummary, UserStats};
use crate::scheduler::AuctionScheduler;
use crate::store::AuctionStore;
use axum::extract::{DefaultBodyLimit, FromRef, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

// endregion: --- Imports

// region:    --- App State
/// 핸들러 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub bid_engine: Arc<BidEngine>,
    pub lifecycle: Arc<LifecycleManager>,
    pub store: Arc<dyn AuctionStore>,
    pub audit: Arc<dyn AuditLog>,
    pub authenticator: Arc<dyn Authenticator>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// 저장소, 감사 로그, 알림 전송, 시계를 묶어 서비스 구성
    pub fn new(
        store: Arc<dyn AuctionStore>,
        audit: Arc<dyn AuditLog>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let rules = BidRules {
            grace_window: config.bid_grace_window,
        };
        let bid_engine = Arc::new(BidEngine::new(
            Arc::clone(&store),
            Arc::clone(&audit),
            Arc::clone(&clock),
            rules,
            config.bid_timeout,
        ));
        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::clone(&store),
            Arc::clone(&audit),
            NotificationGateway::new(Arc::clone(&store), notifier),
            Arc::clone(&clock),
        ));
        let authenticator: Arc<dyn Authenticator> =
            Arc::new(JwtAuthenticator::new(&config.jwt_secret, Arc::clone(&store)));

        Self {
            bid_engine,
            lifecycle,
            store,
            audit,
            authenticator,
            clock,
        }
    }

    /// 자동 종료 스케줄러 생성
    pub fn scheduler(&self, config: &Config) -> AuctionScheduler {
        AuctionScheduler::new(
            Arc::clone(&self.lifecycle),
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            config.sweep_interval,
        )
    }
}

impl FromRef<AppState> for Arc<dyn Authenticator> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.authenticator)
    }
}
// endregion: --- App State

// region:    --- Router
pub fn router(state: AppState) -> Router {
    // 모바일 앱/웹 클라이언트용 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handle_health))
        .route(
            "/api/auctions",
            get(handle_list_active).post(handle_create_auction),
        )
        .route("/api/auctions/ended", get(handle_list_ended))
        .route("/api/auctions/hot", get(handle_get_hot))
        .route("/api/auctions/admin/pending", get(handle_admin_pending))
        .route("/api/auctions/admin/all", get(handle_admin_all))
        .route("/api/auctions/admin/logs", get(handle_admin_logs))
        .route("/api/auctions/:id", get(handle_get_auction))
        .route("/api/auctions/:id/bid", post(handle_place_bid))
        .route("/api/auctions/:id/end", post(handle_end_auction))
        .route("/api/auctions/:id/approve", post(handle_approve_auction))
        .route("/api/auctions/:id/reject", post(handle_reject_auction))
        .route("/api/auctions/:id/delay-end", post(handle_delay_end))
        .route("/api/auctions/:id/set-hot", post(handle_set_hot))
        .route("/api/users/me/auctions/selling", get(handle_my_selling))
        .route("/api/users/me/auctions/bidding", get(handle_my_bidding))
        .route("/api/users/me/auctions/won", get(handle_my_won))
        .route("/api/users/me/stats", get(handle_my_stats))
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}
// endregion: --- Router

// region:    --- Request / Response
#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct BidResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub receipt: BidReceipt,
}

#[derive(Debug, Deserialize)]
pub struct DelayRequest {
    pub minutes: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetHotRequest {
    pub is_hot: bool,
}

#[derive(Debug, Deserialize)]
pub struct LogQueryParams {
    pub auction_id: Option<i64>,
    pub limit: Option<i64>,
}
// endregion: --- Request / Response

// region:    --- Query Handlers

/// 헬스 체크
async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": state.clock.now(),
    }))
}

/// 진행 중인 경매 목록
async fn handle_list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<AuctionSummary>>, AuctionError> {
    let rows = state.store.list_auctions(&AuctionFilter::active()).await?;
    Ok(Json(rows))
}

/// 최근 종료된 경매 목록
async fn handle_list_ended(
    State(state): State<AppState>,
) -> Result<Json<Vec<AuctionSummary>>, AuctionError> {
    let rows = state
        .store
        .list_auctions(&AuctionFilter::recently_ended())
        .await?;
    Ok(Json(rows))
}

/// 현재 핫한 경매 (없으면 null)
async fn handle_get_hot(
    State(state): State<AppState>,
) -> Result<Json<Option<AuctionSummary>>, AuctionError> {
    let rows = state.store.list_auctions(&AuctionFilter::hot()).await?;
    Ok(Json(rows.into_iter().next()))
}

/// 경매 상세
async fn handle_get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<Json<AuctionDetail>, AuctionError> {
    let detail = state.store.auction_detail(auction_id).await?;
    Ok(Json(detail))
}

/// 승인 대기 경매 목록 (관리자)
async fn handle_admin_pending(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<AuctionSummary>>, AuctionError> {
    ctx.require_admin()?;
    let rows = state.store.list_auctions(&AuctionFilter::pending()).await?;
    Ok(Json(rows))
}

/// 전체 경매 목록 (관리자)
async fn handle_admin_all(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<AuctionSummary>>, AuctionError> {
    ctx.require_admin()?;
    let rows = state.store.list_auctions(&AuctionFilter::all()).await?;
    Ok(Json(rows))
}

/// 감사 로그 조회 (관리자)
async fn handle_admin_logs(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<Vec<AuditRecord>>, AuctionError> {
    ctx.require_admin()?;
    let logs = state
        .audit
        .list_logs(AuditQuery::new(params.auction_id, params.limit))
        .await?;
    Ok(Json(logs))
}

/// 내가 등록한 경매
async fn handle_my_selling(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<AuctionSummary>>, AuctionError> {
    let rows = state
        .store
        .list_auctions(&AuctionFilter::selling_by(ctx.user_id))
        .await?;
    Ok(Json(rows))
}

/// 내가 입찰한 경매
async fn handle_my_bidding(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<AuctionSummary>>, AuctionError> {
    let rows = state
        .store
        .list_auctions(&AuctionFilter::bid_by(ctx.user_id))
        .await?;
    Ok(Json(rows))
}

/// 내가 낙찰받은 경매
async fn handle_my_won(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<AuctionSummary>>, AuctionError> {
    let rows = state
        .store
        .list_auctions(&AuctionFilter::won_by(ctx.user_id))
        .await?;
    Ok(Json(rows))
}

/// 내 경매 통계
async fn handle_my_stats(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<UserStats>, AuctionError> {
    let stats = state.store.user_stats(ctx.user_id).await?;
    Ok(Json(stats))
}

// endregion: --- Query Handlers

// region:    --- Command Handlers

/// 경매 등록
async fn handle_create_auction(
    State(state): State<AppState>,
    ctx: AuthContext,
    meta: RequestMeta,
    Json(req): Json<NewAuction>,
) -> Result<(StatusCode, Json<Auction>), AuctionError> {
    let auction = state.lifecycle.create(&ctx, req, &meta).await?;
    Ok((StatusCode::CREATED, Json(auction)))
}

/// 입찰 요청 처리
async fn handle_place_bid(
    State(state): State<AppState>,
    ctx: AuthContext,
    meta: RequestMeta,
    Path(auction_id): Path<i64>,
    Json(req): Json<BidRequest>,
) -> Result<Json<BidResponse>, AuctionError> {
    info!(
        "{:<12} --> 입찰 요청 auction: {}, bidder: {}, amount: {}",
        "Handler", auction_id, ctx.user_id, req.amount
    );
    let receipt = state
        .bid_engine
        .place_bid(&ctx, auction_id, req.amount, &meta)
        .await?;
    Ok(Json(BidResponse {
        message: "입찰이 완료되었습니다.",
        receipt,
    }))
}

/// 경매 종료 (판매자 또는 관리자)
async fn handle_end_auction(
    State(state): State<AppState>,
    ctx: AuthContext,
    meta: RequestMeta,
    Path(auction_id): Path<i64>,
) -> Result<Json<Auction>, AuctionError> {
    let auction = state.lifecycle.end(&ctx, auction_id, &meta).await?;
    Ok(Json(auction))
}

/// 경매 승인 (관리자)
async fn handle_approve_auction(
    State(state): State<AppState>,
    ctx: AuthContext,
    meta: RequestMeta,
    Path(auction_id): Path<i64>,
) -> Result<Json<Auction>, AuctionError> {
    let auction = state.lifecycle.approve(&ctx, auction_id, &meta).await?;
    Ok(Json(auction))
}

/// 경매 거부 (관리자)
async fn handle_reject_auction(
    State(state): State<AppState>,
    ctx: AuthContext,
    meta: RequestMeta,
    Path(auction_id): Path<i64>,
) -> Result<Json<Auction>, AuctionError> {
    let auction = state.lifecycle.reject(&ctx, auction_id, &meta).await?;
    Ok(Json(auction))
}

/// 경매 종료 지연 (관리자)
async fn handle_delay_end(
    State(state): State<AppState>,
    ctx: AuthContext,
    meta: RequestMeta,
    Path(auction_id): Path<i64>,
    Json(req): Json<DelayRequest>,
) -> Result<Json<Auction>, AuctionError> {
    let auction = state
        .lifecycle
        .delay(&ctx, auction_id, req.minutes, &meta)
        .await?;
    Ok(Json(auction))
}

/// 핫한 경매 설정/해제 (관리자)
async fn handle_set_hot(
    State(state): State<AppState>,
    ctx: AuthContext,
    meta: RequestMeta,
    Path(auction_id): Path<i64>,
    Json(req): Json<SetHotRequest>,
) -> Result<Json<Auction>, AuctionError> {
    let auction = state
        .lifecycle
        .set_hot(&ctx, auction_id, req.is_hot, &meta)
        .await?;
    Ok(Json(auction))
}

// endregion: --- Command Handlers
