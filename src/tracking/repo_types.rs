use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};

/// Schemaless JSONB fragment (photos, interests, metadata...).
pub type JsonBag = Json<serde_json::Map<String, serde_json::Value>>;

/// Declares a string-backed enum stored in a VARCHAR column.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

string_enum!(SwipeDirection { Left => "left", Right => "right", Super => "super" });
string_enum!(AbTestStatus { Active => "active", Completed => "completed", Paused => "paused" });
string_enum!(MessageSender { User => "user", Match => "match" });
string_enum!(AiModelType { Scoring => "scoring", Preference => "preference", Nlp => "nlp" });
string_enum!(AutomationAction {
    Swipe => "swipe",
    ProfileUpdate => "profile_update",
    Message => "message",
});
string_enum!(AutomationStatus { Success => "success", Failed => "failed", Warning => "warning" });

/// A dating-platform account linked to a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DatingAccount {
    pub id: i64,
    pub user_id: i64,
    pub platform: String,
    pub account_id: Option<String>,
    #[serde(skip_serializing)]
    pub session_token: Option<String>, // platform session, never exposed
    pub is_active: bool,
    pub last_sync_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl DatingAccount {
    pub const TABLE: &'static str = "dating_accounts";
}

/// Candidate bio/photo set used in A/B tests.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub dating_account_id: i64,
    pub profile_name: String,
    pub bio: Option<String>,
    pub photos: Option<JsonBag>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub interests: Option<JsonBag>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl Profile {
    pub const TABLE: &'static str = "profiles";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AbTest {
    pub id: i64,
    pub dating_account_id: i64,
    pub test_name: String,
    pub profile_a_id: i64,
    pub profile_b_id: i64,
    pub start_date: OffsetDateTime,
    pub end_date: Option<OffsetDateTime>,
    pub status: String, // AbTestStatus
    pub swipes_per_profile: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl AbTest {
    pub const TABLE: &'static str = "ab_tests";

    pub fn status(&self) -> Result<AbTestStatus, UnknownVariant> {
        self.status.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SwipeRecord {
    pub id: i64,
    pub dating_account_id: i64,
    pub profile_id: Option<i64>,
    pub ab_test_id: Option<i64>,
    pub target_name: Option<String>,
    pub target_age: Option<i32>,
    pub target_bio: Option<String>,
    pub target_photos: Option<JsonBag>,
    pub target_distance: Option<i32>, // km
    pub swipe_direction: String,      // SwipeDirection
    pub is_match: bool,
    pub ai_score: Option<f64>,
    pub decision_reason: Option<String>,
    pub swiped_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl SwipeRecord {
    pub const TABLE: &'static str = "swipe_records";

    pub fn direction(&self) -> Result<SwipeDirection, UnknownVariant> {
        self.swipe_direction.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: i64,
    pub swipe_record_id: i64,
    pub dating_account_id: i64,
    pub profile_id: Option<i64>,
    pub match_name: Option<String>,
    pub match_profile_data: Option<JsonBag>,
    pub matched_at: OffsetDateTime,
    pub first_message_sent: bool,
    pub first_message_received: bool,
    pub conversation_started: bool,
    pub unmatched_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Match {
    pub const TABLE: &'static str = "matches";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub match_id: i64,
    pub sender: String, // MessageSender
    pub content: String,
    pub sentiment_score: Option<f64>,
    pub sent_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl Message {
    pub const TABLE: &'static str = "messages";

    pub fn sender(&self) -> Result<MessageSender, UnknownVariant> {
        self.sender.parse()
    }
}

/// Daily rollup per account, optionally scoped to a profile or A/B test.
/// Rates are percentages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalyticsSnapshot {
    pub id: i64,
    pub dating_account_id: i64,
    pub profile_id: Option<i64>,
    pub ab_test_id: Option<i64>,
    pub snapshot_date: Date,
    pub total_swipes: i32,
    pub right_swipes: i32,
    pub left_swipes: i32,
    pub matches_count: i32,
    pub match_rate: Option<f64>,
    pub message_response_rate: Option<f64>,
    pub avg_ai_score: Option<f64>,
    pub metadata: Option<JsonBag>,
    pub created_at: OffsetDateTime,
}

impl AnalyticsSnapshot {
    pub const TABLE: &'static str = "analytics_snapshots";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiModel {
    pub id: i64,
    pub dating_account_id: i64,
    pub model_name: String,
    pub model_type: String, // AiModelType
    pub model_version: String,
    pub model_path: Option<String>,
    pub parameters: Option<JsonBag>,
    pub accuracy_score: Option<f64>,
    pub is_active: bool,
    pub trained_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl AiModel {
    pub const TABLE: &'static str = "ai_models";

    pub fn model_type(&self) -> Result<AiModelType, UnknownVariant> {
        self.model_type.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AutomationLog {
    pub id: i64,
    pub dating_account_id: i64,
    pub action_type: String, // AutomationAction
    pub status: String,      // AutomationStatus
    pub error_message: Option<String>,
    pub metadata: Option<JsonBag>,
    pub executed_at: OffsetDateTime,
}

impl AutomationLog {
    pub const TABLE: &'static str = "automation_logs";

    pub fn action(&self) -> Result<AutomationAction, UnknownVariant> {
        self.action_type.parse()
    }

    pub fn status(&self) -> Result<AutomationStatus, UnknownVariant> {
        self.status.parse()
    }
}
