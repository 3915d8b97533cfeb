/// 경매 감사 로그 (추가만 허용)
/// 모든 변경 작업은 커밋 이후 기록되며, 기록 실패는 로그로만 남기고 요청 결과에 영향을 주지 않는다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::auth::RequestMeta;
use crate::database::DatabaseManager;
use crate::error::AuctionError;
use crate::query::queries;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

// endregion: --- Imports

pub const DEFAULT_LOG_LIMIT: i64 = 100;
pub const MAX_LOG_LIMIT: i64 = 1000;

// region:    --- Audit Model
/// 기록할 감사 로그 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub auction_id: i64,
    // 스케줄러 자동 처리는 None
    pub user_id: Option<i64>,
    pub action: String,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        auction_id: i64,
        user_id: Option<i64>,
        event: &AuctionEvent,
        meta: &RequestMeta,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            auction_id,
            user_id,
            action: event.action().to_string(),
            details: event.details(),
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            timestamp,
        }
    }
}

/// 조회용 감사 로그 (사용자 이름, 경매 제목 포함)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditRecord {
    pub id: i64,
    pub auction_id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub auction_title: Option<String>,
    pub action: String,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// 감사 로그 조회 조건
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditQuery {
    pub auction_id: Option<i64>,
    pub limit: i64,
}

impl AuditQuery {
    /// limit 기본 100, 1..=1000 범위로 보정
    pub fn new(auction_id: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            auction_id,
            limit: limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT),
        }
    }
}
// endregion: --- Audit Model

// region:    --- Audit Log Trait
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuctionError>;

    /// 최신순 조회
    async fn list_logs(&self, query: AuditQuery) -> Result<Vec<AuditRecord>, AuctionError>;
}
// endregion: --- Audit Log Trait

// region:    --- Postgres Audit Log
pub struct PostgresAuditLog {
    db: Arc<DatabaseManager>,
}

impl PostgresAuditLog {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuctionError> {
        sqlx::query(queries::INSERT_AUDIT_LOG)
            .bind(entry.auction_id)
            .bind(entry.user_id)
            .bind(entry.action)
            .bind(entry.details)
            .bind(entry.ip_address)
            .bind(entry.user_agent)
            .bind(entry.timestamp)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn list_logs(&self, query: AuditQuery) -> Result<Vec<AuditRecord>, AuctionError> {
        let mut qb = QueryBuilder::<Postgres>::new(queries::SELECT_AUDIT_LOGS);
        if let Some(auction_id) = query.auction_id {
            qb.push(" WHERE l.auction_id = ").push_bind(auction_id);
        }
        qb.push(" ORDER BY l.timestamp DESC, l.id DESC LIMIT ")
            .push_bind(query.limit);

        let rows = qb
            .build_query_as::<AuditRecord>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }
}
// endregion: --- Postgres Audit Log

// region:    --- Memory Audit Log
/// 메모리 감사 로그 (사용자 이름, 경매 제목은 채우지 않음)
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
    next_id: AtomicI64,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuctionError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = AuditRecord {
            id,
            auction_id: entry.auction_id,
            user_id: entry.user_id,
            username: None,
            auction_title: None,
            action: entry.action,
            details: entry.details,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            timestamp: entry.timestamp,
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }

    async fn list_logs(&self, query: AuditQuery) -> Result<Vec<AuditRecord>, AuctionError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<AuditRecord> = records
            .iter()
            .filter(|r| query.auction_id.map_or(true, |id| r.auction_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        rows.truncate(usize::try_from(query.limit).unwrap_or(0));
        Ok(rows)
    }
}
// endregion: --- Memory Audit Log

// endregion: --- Tests
