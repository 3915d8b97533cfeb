// region:    --- Imports
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Auction Status
/// 경매 상태
/// pending -> active -> ended, pending -> rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Pending,
    Active,
    Ended,
    Rejected,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Pending => "pending",
            AuctionStatus::Active => "active",
            AuctionStatus::Ended => "ended",
            AuctionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("알 수 없는 경매 상태입니다: {0}")]
pub struct ParseStatusError(String);

impl FromStr for AuctionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AuctionStatus::Pending),
            "active" => Ok(AuctionStatus::Active),
            "ended" => Ok(AuctionStatus::Ended),
            "rejected" => Ok(AuctionStatus::Rejected),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

// sqlx FromRow 의 try_from 변환용
impl TryFrom<String> for AuctionStatus {
    type Error = ParseStatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
// endregion: --- Auction Status

// region:    --- Duration Code
/// 경매 기간 코드 (1h, 6h, 1d, 3d)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DurationCode {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
}

impl DurationCode {
    pub fn minutes(&self) -> i32 {
        match self {
            DurationCode::OneHour => 60,
            DurationCode::SixHours => 360,
            DurationCode::OneDay => 1440,
            DurationCode::ThreeDays => 4320,
        }
    }
}

impl FromStr for DurationCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(DurationCode::OneHour),
            "6h" => Ok(DurationCode::SixHours),
            "1d" => Ok(DurationCode::OneDay),
            "3d" => Ok(DurationCode::ThreeDays),
            other => Err(format!(
                "유효하지 않은 경매 기간입니다: {} (1h, 6h, 1d, 3d 중 선택)",
                other
            )),
        }
    }
}
// endregion: --- Duration Code

// region:    --- Auction Model
/// 경매 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Auction {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub starting_price: i64,
    pub current_price: i64,
    pub seller_id: i64,
    pub category: Option<String>,
    pub images: Vec<String>,
    #[sqlx(try_from = "String")]
    pub status: AuctionStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    pub is_hot: bool,
    pub winning_bid_id: Option<i64>,
    pub winner_id: Option<i64>,
    pub final_price: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auction {
    /// 종료 시점에 확정된 낙찰 정보
    pub fn winner(&self) -> Option<Winner> {
        match (self.winning_bid_id, self.winner_id, self.final_price) {
            (Some(bid_id), Some(bidder_id), Some(amount)) => Some(Winner {
                bid_id,
                bidder_id,
                amount,
            }),
            _ => None,
        }
    }

    /// 종료까지 남은 시간 (활성 경매가 아니면 None)
    pub fn time_left(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.end_time.map(|end| end - now)
    }
}

/// 낙찰 정보
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub bid_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
}

/// 경매 등록 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuction {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starting_price: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// 검증을 통과한 경매 등록 정보
#[derive(Debug, Clone)]
pub struct AuctionDraft {
    pub title: String,
    pub description: String,
    pub starting_price: i64,
    pub seller_id: i64,
    pub category: Option<String>,
    pub images: Vec<String>,
    pub duration_minutes: i32,
}

impl NewAuction {
    /// 필수 필드 및 기간 코드 검증
    pub fn validate(self, seller_id: i64) -> Result<AuctionDraft, String> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err("필수 필드가 누락되었습니다. (title)".to_string());
        }
        if self.starting_price <= 0 {
            return Err("시작 가격은 0보다 커야 합니다.".to_string());
        }
        let duration = match self.duration.as_deref() {
            None => DurationCode::default(),
            Some(code) => code.parse::<DurationCode>()?,
        };
        let images = self
            .image_urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();

        Ok(AuctionDraft {
            title,
            description: self.description,
            starting_price: self.starting_price,
            seller_id,
            category: self.category.filter(|c| !c.trim().is_empty()),
            images,
            duration_minutes: duration.minutes(),
        })
    }
}
// endregion: --- Auction Model

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    fn request(duration: Option<&str>) -> NewAuction {
        NewAuction {
            title: "  전공 서적  ".to_string(),
            description: "거의 새 책".to_string(),
            starting_price: 10000,
            category: Some("도서".to_string()),
            image_urls: vec!["https://img/1.jpg".to_string(), " ".to_string()],
            duration: duration.map(str::to_string),
        }
    }

    #[test]
    fn duration_defaults_to_one_day() {
        let draft = request(None).validate(7).unwrap();
        assert_eq!(draft.duration_minutes, 1440);
        assert_eq!(draft.title, "전공 서적");
        assert_eq!(draft.images, vec!["https://img/1.jpg".to_string()]);
    }

    #[test]
    fn known_duration_codes_map_to_minutes() {
        assert_eq!(request(Some("1h")).validate(1).unwrap().duration_minutes, 60);
        assert_eq!(request(Some("6h")).validate(1).unwrap().duration_minutes, 360);
        assert_eq!(request(Some("3d")).validate(1).unwrap().duration_minutes, 4320);
    }

    #[test]
    fn unknown_duration_code_is_rejected() {
        assert!(request(Some("2w")).validate(1).is_err());
    }

    #[test]
    fn blank_title_and_non_positive_price_are_rejected() {
        let mut req = request(None);
        req.title = "   ".to_string();
        assert!(req.validate(1).is_err());

        let mut req = request(None);
        req.starting_price = 0;
        assert!(req.validate(1).is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            AuctionStatus::Pending,
            AuctionStatus::Active,
            AuctionStatus::Ended,
            AuctionStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<AuctionStatus>().unwrap(), status);
        }
        assert!("open".parse::<AuctionStatus>().is_err());
    }
}
// endregion: --- Tests
