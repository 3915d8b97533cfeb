/// 인증 어댑터
/// 토큰 발급, 회원 가입, 비밀번호 관리는 외부 인증 서비스 담당
/// 여기서는 토큰 검증과 역할 조회만 수행하고, 그 결과를 요청 단위 컨텍스트로 전달한다.
// region:    --- Imports
use crate::error::AuctionError;
use crate::store::AuctionStore;
use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

// endregion: --- Imports

// region:    --- Identity
/// 사용자 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("알 수 없는 사용자 타입: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// 요청 단위 인증 컨텍스트
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 관리자 권한 확인
    pub fn require_admin(&self) -> Result<(), AuctionError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuctionError::admin_required())
        }
    }
}

/// 사용자 디렉터리 항목 (알림 발송, 역할 확인용)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}
// endregion: --- Identity

// region:    --- Authenticator
/// 토큰 검증 및 사용자 식별
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify_and_identify(&self, token: &str) -> Result<AuthContext, AuctionError>;
}

/// JWT 클레임
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub exp: usize,
}

/// HS256 JWT 검증 + 사용자 디렉터리 역할 조회
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
    directory: Arc<dyn AuctionStore>,
}

impl JwtAuthenticator {
    pub fn new(secret: &str, directory: Arc<dyn AuctionStore>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            directory,
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn verify_and_identify(&self, token: &str) -> Result<AuthContext, AuctionError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("{:<12} --> 토큰 검증 실패: {:?}", "Auth", e);
                AuctionError::Unauthorized
            })?
            .claims;

        // 역할은 토큰이 아닌 사용자 디렉터리 기준
        let profile = self
            .directory
            .user_profile(claims.user_id)
            .await?
            .ok_or_else(|| {
                warn!(
                    "{:<12} --> 토큰은 유효하나 사용자가 없음: {}",
                    "Auth", claims.user_id
                );
                AuctionError::Unauthorized
            })?;

        Ok(AuthContext {
            user_id: profile.id,
            role: profile.role,
        })
    }
}
// endregion: --- Authenticator

// region:    --- Extractors
/// Authorization: Bearer <token> 추출
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<dyn Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuctionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuctionError::Unauthorized)?;
        let authenticator = Arc::<dyn Authenticator>::from_ref(state);
        authenticator.verify_and_identify(token).await
    }
}

/// 감사 로그용 요청 메타데이터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_string());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(RequestMeta {
            ip_address: forwarded.or(peer),
            user_agent,
        })
    }
}
// endregion: --- Extractors

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_directory_values() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn only_admins_pass_admin_guard() {
        let admin = AuthContext {
            user_id: 1,
            role: Role::Admin,
        };
        let user = AuthContext {
            user_id: 2,
            role: Role::User,
        };
        assert!(admin.require_admin().is_ok());
        assert!(user.require_admin().is_err());
    }
}
// endregion: --- Tests
