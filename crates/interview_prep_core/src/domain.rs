//! crates/interview_prep_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or web framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// An interview-preparation session: a role/experience/topic combination
/// owning an ordered set of generated questions.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub experience: String,
    pub topics_to_focus: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single stored interview question within a session.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: Uuid,
    pub session_id: Uuid,
    pub question: String,
    pub answer: String,
    pub note: Option<String>,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

/// One question/answer pair recovered from raw model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

/// A concept explanation recovered from raw model output.
///
/// Extraction of this shape is total: when a field cannot be recovered it is
/// filled with a fixed placeholder instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptExplanation {
    pub title: String,
    pub explanation: String,
}

/// Subscription tier determining daily resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tier {
    #[default]
    Free,
    Premium,
    Luxury,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Luxury => "luxury",
        }
    }

    /// Parses a stored tier name, falling back to free for unknown values.
    pub fn parse(s: &str) -> Self {
        match s {
            "premium" => Tier::Premium,
            "luxury" => Tier::Luxury,
            _ => Tier::Free,
        }
    }
}

/// Subscription status as reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Unpaid,
    Incomplete,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Incomplete => "incomplete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "unpaid" => Some(SubscriptionStatus::Unpaid),
            "incomplete" => Some(SubscriptionStatus::Incomplete),
            _ => None,
        }
    }
}

/// The metered action category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Sessions,
    Explanations,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Sessions => "sessions",
            ResourceKind::Explanations => "explanations",
        }
    }
}

/// A per-resource daily counter. `last_reset` carries the timestamp of the
/// last persisted reset or increment; the counter is considered stale once
/// the UTC calendar date of `last_reset` differs from today's.
#[derive(Debug, Clone, Copy)]
pub struct DailyCounter {
    pub count: u32,
    pub last_reset: DateTime<Utc>,
}

impl DailyCounter {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            last_reset: now,
        }
    }
}

/// Per-user usage and subscription state. Exactly one record exists per
/// user, created lazily on the first usage check.
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub user_id: Uuid,
    pub tier: Tier,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub sessions: DailyCounter,
    pub explanations: DailyCounter,
}

impl UsageRecord {
    /// A fresh free-tier record with zeroed counters.
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            tier: Tier::Free,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            subscription_status: None,
            subscription_end_date: None,
            sessions: DailyCounter::new(now),
            explanations: DailyCounter::new(now),
        }
    }

    pub fn counter(&self, kind: ResourceKind) -> &DailyCounter {
        match kind {
            ResourceKind::Sessions => &self.sessions,
            ResourceKind::Explanations => &self.explanations,
        }
    }

    pub fn counter_mut(&mut self, kind: ResourceKind) -> &mut DailyCounter {
        match kind {
            ResourceKind::Sessions => &mut self.sessions,
            ResourceKind::Explanations => &mut self.explanations,
        }
    }

    /// Whether the record's subscription entitles it to its non-free tier.
    ///
    /// Free is always "active". A paid tier is active while the provider
    /// status is `active` and the end date, when present, lies in the future.
    pub fn is_subscription_active(&self, now: DateTime<Utc>) -> bool {
        if self.tier == Tier::Free {
            return true;
        }
        self.subscription_status == Some(SubscriptionStatus::Active)
            && self.subscription_end_date.map_or(true, |end| end > now)
    }
}
