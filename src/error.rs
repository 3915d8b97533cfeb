// region:    --- Imports
use crate::auction::model::AuctionStatus;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- Error Kind
/// 호출자 관점의 오류 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidInput,
    Unauthorized,
    Forbidden,
    Conflict,
    Timeout,
    Internal,
}
// endregion: --- Error Kind

// region:    --- Bid Rejection
/// 입찰 거부 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidRejection {
    NotActive,
    SelfBid,
    TooLate,
    PriceTooLow,
}

impl BidRejection {
    pub fn code(&self) -> &'static str {
        match self {
            BidRejection::NotActive => "NOT_ACTIVE",
            BidRejection::SelfBid => "SELF_BID",
            BidRejection::TooLate => "TOO_LATE",
            BidRejection::PriceTooLow => "LOW_BID",
        }
    }
}

fn describe_rejection(reason: &BidRejection, current_price: &i64) -> String {
    match reason {
        BidRejection::NotActive => "진행중인 경매가 아닙니다.".to_string(),
        BidRejection::SelfBid => "자신이 등록한 경매에는 입찰할 수 없습니다.".to_string(),
        BidRejection::TooLate => "경매 종료 1분 전부터는 입찰할 수 없습니다.".to_string(),
        BidRejection::PriceTooLow => format!(
            "현재 가격({}원)보다 높은 금액을 입력해주세요.",
            current_price
        ),
    }
}
// endregion: --- Bid Rejection

// region:    --- Auction Error
#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("경매를 찾을 수 없습니다. (id: {0})")]
    AuctionNotFound(i64),

    #[error("사용자를 찾을 수 없습니다. (id: {0})")]
    UserNotFound(i64),

    /// 입찰 거부: 항상 현재 확정 가격과 상태를 함께 전달
    #[error("{}", describe_rejection(.reason, .current_price))]
    BidRejected {
        reason: BidRejection,
        current_price: i64,
        status: AuctionStatus,
    },

    #[error("현재 상태({status})에서는 {action} 처리를 할 수 없습니다.")]
    InvalidTransition {
        action: &'static str,
        status: AuctionStatus,
    },

    #[error("{0}")]
    InvalidInput(String),

    #[error("인증이 필요합니다.")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("동시 요청 충돌이 발생했습니다. 다시 시도해주세요.")]
    Conflict,

    #[error("요청 처리 시간이 초과되었습니다. 다시 시도해주세요.")]
    Timeout,

    #[error("데이터베이스 오류: {0}")]
    Database(sqlx::Error),

    #[error("내부 오류: {0}")]
    Internal(String),
}

impl AuctionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuctionError::AuctionNotFound(_) | AuctionError::UserNotFound(_) => ErrorKind::NotFound,
            AuctionError::BidRejected { .. } | AuctionError::InvalidTransition { .. } => {
                ErrorKind::InvalidState
            }
            AuctionError::InvalidInput(_) => ErrorKind::InvalidInput,
            AuctionError::Unauthorized => ErrorKind::Unauthorized,
            AuctionError::Forbidden(_) => ErrorKind::Forbidden,
            AuctionError::Conflict => ErrorKind::Conflict,
            AuctionError::Timeout => ErrorKind::Timeout,
            AuctionError::Database(_) | AuctionError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn admin_required() -> Self {
        AuctionError::Forbidden("관리자 권한이 필요합니다.".to_string())
    }

    fn code(&self) -> &'static str {
        match self {
            AuctionError::AuctionNotFound(_) => "AUCTION_NOT_FOUND",
            AuctionError::UserNotFound(_) => "USER_NOT_FOUND",
            AuctionError::BidRejected { reason, .. } => reason.code(),
            AuctionError::InvalidTransition { .. } => "INVALID_STATUS",
            AuctionError::InvalidInput(_) => "INVALID_INPUT",
            AuctionError::Unauthorized => "UNAUTHORIZED",
            AuctionError::Forbidden(_) => "FORBIDDEN",
            AuctionError::Conflict => "CONFLICT",
            AuctionError::Timeout => "TIMEOUT",
            AuctionError::Database(_) | AuctionError::Internal(_) => "INTERNAL",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidState | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 직렬화 실패, 교착 상태, 유일성 위반은 재시도 가능한 충돌로 분류
impl From<sqlx::Error> for AuctionError {
    fn from(e: sqlx::Error) -> Self {
        let code = e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned());
        match code.as_deref() {
            Some("40001") | Some("40P01") | Some("23505") => AuctionError::Conflict,
            _ => AuctionError::Database(e),
        }
    }
}

impl IntoResponse for AuctionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{:<12} --> 요청 처리 실패: {:?}", "Handler", self);
        }

        let mut body = serde_json::json!({
            "error": match self.kind() {
                // 내부 오류 세부 내용은 클라이언트에 노출하지 않음
                ErrorKind::Internal => "서버 오류가 발생했습니다.".to_string(),
                _ => self.to_string(),
            },
            "code": self.code(),
        });
        match &self {
            AuctionError::BidRejected {
                current_price,
                status,
                ..
            } => {
                body["current_price"] = serde_json::json!(current_price);
                body["status"] = serde_json::json!(status);
            }
            AuctionError::InvalidTransition { status, .. } => {
                body["status"] = serde_json::json!(status);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
// endregion: --- Auction Error

// endregion: --- Tests
