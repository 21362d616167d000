//! Dating-platform tracking data: linked accounts, candidate profiles, A/B tests,
//! swipes, matches, messages and analytics. Row shapes only; nothing reads or
//! writes these tables yet.

pub mod repo_types;

/// Every table owned by this module, in foreign-key order.
pub const TABLES: [&str; 9] = [
    repo_types::DatingAccount::TABLE,
    repo_types::Profile::TABLE,
    repo_types::AbTest::TABLE,
    repo_types::SwipeRecord::TABLE,
    repo_types::Match::TABLE,
    repo_types::Message::TABLE,
    repo_types::AnalyticsSnapshot::TABLE,
    repo_types::AiModel::TABLE,
    repo_types::AutomationLog::TABLE,
];
