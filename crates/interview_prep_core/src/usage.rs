//! crates/interview_prep_core/src/usage.rs
//!
//! Tier-based daily usage accounting. One [`UsageRecord`] per user tracks a
//! counter per metered resource; counters roll over at UTC calendar-day
//! boundaries. Checking a limit and charging usage are separate steps: the
//! gated action (an expensive model call) can still fail after the check
//! passes, and usage is only charged on confirmed success.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{DailyCounter, ResourceKind, Tier, UsageRecord};
use crate::ports::{PortResult, UsageStore};

/// A daily limit. `Unlimited` is the distinguished no-cap value, rendered
/// as `-1` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Capped(u32),
    Unlimited,
}

impl Limit {
    /// Wire representation: the cap, or `-1` for unlimited.
    pub fn as_wire(&self) -> i64 {
        match self {
            Limit::Capped(n) => *n as i64,
            Limit::Unlimited => -1,
        }
    }
}

/// The per-resource daily limits of a tier.
#[derive(Debug, Clone, Copy)]
pub struct TierLimits {
    pub sessions: Limit,
    pub explanations: Limit,
}

impl TierLimits {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self {
                sessions: Limit::Capped(1),
                explanations: Limit::Capped(3),
            },
            Tier::Premium => Self {
                sessions: Limit::Capped(20),
                explanations: Limit::Capped(50),
            },
            Tier::Luxury => Self {
                sessions: Limit::Unlimited,
                explanations: Limit::Unlimited,
            },
        }
    }

    pub fn limit_for(&self, kind: ResourceKind) -> Limit {
        match kind {
            ResourceKind::Sessions => self.sessions,
            ResourceKind::Explanations => self.explanations,
        }
    }
}

/// The outcome of a usage check, carried back to the handler so a rejection
/// can be rendered with its remaining-quota context.
#[derive(Debug, Clone, Copy)]
pub struct UsageDecision {
    pub allowed: bool,
    pub tier: Tier,
    pub limit: Limit,
    pub remaining: Limit,
}

/// Usage figures for one resource kind, for the usage endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ResourceUsage {
    pub used: u32,
    pub remaining: Limit,
    pub limit: Limit,
}

/// A snapshot of a user's current usage across all metered resources.
#[derive(Debug, Clone)]
pub struct UsageSummary {
    pub tier: Tier,
    pub subscription_status: Option<crate::domain::SubscriptionStatus>,
    pub is_subscription_active: bool,
    pub sessions: ResourceUsage,
    pub explanations: ResourceUsage,
}

/// Decides whether metered actions are permitted and records consumption.
///
/// State lives behind the [`UsageStore`] port; the ledger itself holds no
/// mutable state and is safe to share. Load-then-save is not assumed atomic,
/// so concurrent increments for one user can under-enforce by one unit.
#[derive(Clone)]
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Loads the user's record, creating a fresh free-tier one on first use.
    pub async fn load_or_create(&self, user_id: Uuid) -> PortResult<UsageRecord> {
        self.load_or_create_at(user_id, Utc::now()).await
    }

    /// Checks whether the user may consume one unit of `kind` today.
    ///
    /// Performs the lazy downgrade as a persisted side effect: a non-free
    /// tier whose subscription is no longer active is coerced back to free
    /// before the limit is resolved. A stale counter is treated as zero for
    /// the comparison, but the reset itself is not persisted here.
    pub async fn check(&self, user_id: Uuid, kind: ResourceKind) -> PortResult<UsageDecision> {
        self.check_at(user_id, kind, Utc::now()).await
    }

    /// Charges one unit of `kind`. Called only after the gated action
    /// succeeded. No-op for an unlimited tier.
    pub async fn increment(&self, user_id: Uuid, kind: ResourceKind) -> PortResult<()> {
        self.increment_at(user_id, kind, Utc::now()).await
    }

    /// Remaining quota for `kind` today.
    pub async fn remaining(&self, user_id: Uuid, kind: ResourceKind) -> PortResult<Limit> {
        self.remaining_at(user_id, kind, Utc::now()).await
    }

    /// Usage snapshot across both resource kinds.
    pub async fn summary(&self, user_id: Uuid) -> PortResult<UsageSummary> {
        self.summary_at(user_id, Utc::now()).await
    }

    async fn load_or_create_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<UsageRecord> {
        if let Some(record) = self.store.load_usage_record(user_id).await? {
            return Ok(record);
        }
        let record = UsageRecord::new(user_id, now);
        self.store.save_usage_record(&record).await?;
        Ok(record)
    }

    /// Loads the record and applies the lazy downgrade when the paid
    /// subscription has lapsed.
    async fn load_current_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<UsageRecord> {
        let mut record = self.load_or_create_at(user_id, now).await?;
        if record.tier != Tier::Free && !record.is_subscription_active(now) {
            record.tier = Tier::Free;
            record.subscription_status = None;
            self.store.save_usage_record(&record).await?;
        }
        Ok(record)
    }

    async fn check_at(
        &self,
        user_id: Uuid,
        kind: ResourceKind,
        now: DateTime<Utc>,
    ) -> PortResult<UsageDecision> {
        let record = self.load_current_at(user_id, now).await?;
        let limit = TierLimits::for_tier(record.tier).limit_for(kind);

        match limit {
            Limit::Unlimited => Ok(UsageDecision {
                allowed: true,
                tier: record.tier,
                limit,
                remaining: Limit::Unlimited,
            }),
            Limit::Capped(cap) => {
                let used = effective_count(record.counter(kind), now);
                Ok(UsageDecision {
                    allowed: used < cap,
                    tier: record.tier,
                    limit,
                    remaining: Limit::Capped(cap.saturating_sub(used)),
                })
            }
        }
    }

    async fn increment_at(
        &self,
        user_id: Uuid,
        kind: ResourceKind,
        now: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut record = self.load_or_create_at(user_id, now).await?;
        if TierLimits::for_tier(record.tier).limit_for(kind) == Limit::Unlimited {
            return Ok(());
        }

        let stale = is_new_day(record.counter(kind).last_reset, now);
        let counter = record.counter_mut(kind);
        if stale {
            counter.count = 1;
            counter.last_reset = now;
        } else {
            counter.count += 1;
        }
        self.store.save_usage_record(&record).await
    }

    async fn remaining_at(
        &self,
        user_id: Uuid,
        kind: ResourceKind,
        now: DateTime<Utc>,
    ) -> PortResult<Limit> {
        let decision = self.check_at(user_id, kind, now).await?;
        Ok(decision.remaining)
    }

    async fn summary_at(&self, user_id: Uuid, now: DateTime<Utc>) -> PortResult<UsageSummary> {
        let record = self.load_current_at(user_id, now).await?;
        let limits = TierLimits::for_tier(record.tier);

        let resource = |kind: ResourceKind| -> ResourceUsage {
            let limit = limits.limit_for(kind);
            let used = effective_count(record.counter(kind), now);
            let remaining = match limit {
                Limit::Unlimited => Limit::Unlimited,
                Limit::Capped(cap) => Limit::Capped(cap.saturating_sub(used)),
            };
            ResourceUsage {
                used,
                remaining,
                limit,
            }
        };

        Ok(UsageSummary {
            tier: record.tier,
            subscription_status: record.subscription_status,
            is_subscription_active: record.is_subscription_active(now),
            sessions: resource(ResourceKind::Sessions),
            explanations: resource(ResourceKind::Explanations),
        })
    }
}

/// Count as of `now`: zero when the stored counter belongs to an earlier
/// UTC calendar day.
fn effective_count(counter: &DailyCounter, now: DateTime<Utc>) -> u32 {
    if is_new_day(counter.last_reset, now) {
        0
    } else {
        counter.count
    }
}

/// Calendar-day comparison in UTC, not a rolling 24h window.
fn is_new_day(last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    last_reset.date_naive() != now.date_naive()
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SubscriptionStatus;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct InMemoryStore {
        records: Mutex<HashMap<Uuid, UsageRecord>>,
    }

    impl InMemoryStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(HashMap::new()),
            })
        }

        fn get(&self, user_id: Uuid) -> Option<UsageRecord> {
            self.records.lock().unwrap().get(&user_id).cloned()
        }

        fn put(&self, record: UsageRecord) {
            self.records.lock().unwrap().insert(record.user_id, record);
        }
    }

    #[async_trait]
    impl UsageStore for InMemoryStore {
        async fn load_usage_record(&self, user_id: Uuid) -> PortResult<Option<UsageRecord>> {
            Ok(self.get(user_id))
        }

        async fn save_usage_record(&self, record: &UsageRecord) -> PortResult<()> {
            self.put(record.clone());
            Ok(())
        }
    }

    fn setup() -> (Arc<InMemoryStore>, UsageLedger, Uuid) {
        let store = InMemoryStore::new();
        let ledger = UsageLedger::new(store.clone() as Arc<dyn UsageStore>);
        (store, ledger, Uuid::new_v4())
    }

    #[tokio::test]
    async fn first_check_creates_free_record_and_allows() {
        let (store, ledger, user) = setup();
        let decision = ledger.check(user, ResourceKind::Sessions).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.tier, Tier::Free);
        assert_eq!(decision.limit, Limit::Capped(1));
        assert!(store.get(user).is_some());
    }

    #[tokio::test]
    async fn free_tier_session_limit_is_one_per_day() {
        let (_store, ledger, user) = setup();
        let first = ledger.check(user, ResourceKind::Sessions).await.unwrap();
        assert!(first.allowed);

        ledger.increment(user, ResourceKind::Sessions).await.unwrap();

        let second = ledger.check(user, ResourceKind::Sessions).await.unwrap();
        assert!(!second.allowed);
        assert_eq!(second.remaining, Limit::Capped(0));
    }

    #[tokio::test]
    async fn counter_resets_on_next_calendar_day() {
        let (_store, ledger, user) = setup();
        let now = Utc::now();
        ledger
            .increment_at(user, ResourceKind::Sessions, now)
            .await
            .unwrap();
        assert!(
            !ledger
                .check_at(user, ResourceKind::Sessions, now)
                .await
                .unwrap()
                .allowed
        );

        let tomorrow = now + Duration::days(1);
        let decision = ledger
            .check_at(user, ResourceKind::Sessions, tomorrow)
            .await
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, Limit::Capped(1));
    }

    #[tokio::test]
    async fn check_does_not_persist_the_reset() {
        let (store, ledger, user) = setup();
        let yesterday = Utc::now() - Duration::days(1);
        let mut record = UsageRecord::new(user, yesterday);
        record.sessions.count = 1;
        store.put(record);

        let decision = ledger.check(user, ResourceKind::Sessions).await.unwrap();
        assert!(decision.allowed);

        // The stale count is still on disk; only an increment writes the reset.
        assert_eq!(store.get(user).unwrap().sessions.count, 1);
    }

    #[tokio::test]
    async fn increment_after_rollover_starts_at_one() {
        let (store, ledger, user) = setup();
        let yesterday = Utc::now() - Duration::days(1);
        let mut record = UsageRecord::new(user, yesterday);
        record.explanations.count = 3;
        store.put(record);

        ledger
            .increment(user, ResourceKind::Explanations)
            .await
            .unwrap();
        assert_eq!(store.get(user).unwrap().explanations.count, 1);
    }

    #[tokio::test]
    async fn free_tier_allows_three_explanations() {
        let (_store, ledger, user) = setup();
        for _ in 0..3 {
            assert!(
                ledger
                    .check(user, ResourceKind::Explanations)
                    .await
                    .unwrap()
                    .allowed
            );
            ledger
                .increment(user, ResourceKind::Explanations)
                .await
                .unwrap();
        }
        let fourth = ledger.check(user, ResourceKind::Explanations).await.unwrap();
        assert!(!fourth.allowed);
    }

    #[tokio::test]
    async fn luxury_tier_is_unlimited_and_uncharged() {
        let (store, ledger, user) = setup();
        let now = Utc::now();
        let mut record = UsageRecord::new(user, now);
        record.tier = Tier::Luxury;
        record.subscription_status = Some(SubscriptionStatus::Active);
        store.put(record);

        for _ in 0..5 {
            ledger.increment(user, ResourceKind::Sessions).await.unwrap();
        }
        let remaining = ledger.remaining(user, ResourceKind::Sessions).await.unwrap();
        assert_eq!(remaining, Limit::Unlimited);
        assert_eq!(store.get(user).unwrap().sessions.count, 0);
    }

    #[tokio::test]
    async fn lapsed_premium_is_downgraded_during_check() {
        let (store, ledger, user) = setup();
        let now = Utc::now();
        let mut record = UsageRecord::new(user, now);
        record.tier = Tier::Premium;
        record.subscription_status = Some(SubscriptionStatus::Active);
        record.subscription_end_date = Some(now - Duration::days(2));
        store.put(record);

        let decision = ledger.check(user, ResourceKind::Sessions).await.unwrap();
        assert_eq!(decision.tier, Tier::Free);
        assert_eq!(decision.limit, Limit::Capped(1));

        let persisted = store.get(user).unwrap();
        assert_eq!(persisted.tier, Tier::Free);
        assert!(persisted.subscription_status.is_none());
    }

    #[tokio::test]
    async fn active_premium_keeps_its_limits() {
        let (store, ledger, user) = setup();
        let now = Utc::now();
        let mut record = UsageRecord::new(user, now);
        record.tier = Tier::Premium;
        record.subscription_status = Some(SubscriptionStatus::Active);
        record.subscription_end_date = Some(now + Duration::days(10));
        store.put(record);

        let decision = ledger.check(user, ResourceKind::Sessions).await.unwrap();
        assert_eq!(decision.tier, Tier::Premium);
        assert_eq!(decision.limit, Limit::Capped(20));

        let explanations = ledger
            .check(user, ResourceKind::Explanations)
            .await
            .unwrap();
        assert_eq!(explanations.limit, Limit::Capped(50));
    }

    #[tokio::test]
    async fn canceled_status_without_end_date_downgrades() {
        let (store, ledger, user) = setup();
        let now = Utc::now();
        let mut record = UsageRecord::new(user, now);
        record.tier = Tier::Premium;
        record.subscription_status = Some(SubscriptionStatus::Canceled);
        store.put(record);

        let decision = ledger.check(user, ResourceKind::Sessions).await.unwrap();
        assert_eq!(decision.tier, Tier::Free);
    }

    #[tokio::test]
    async fn summary_reports_both_resources() {
        let (_store, ledger, user) = setup();
        ledger
            .increment(user, ResourceKind::Explanations)
            .await
            .unwrap();

        let summary = ledger.summary(user).await.unwrap();
        assert_eq!(summary.tier, Tier::Free);
        assert!(summary.is_subscription_active);
        assert_eq!(summary.sessions.used, 0);
        assert_eq!(summary.sessions.remaining, Limit::Capped(1));
        assert_eq!(summary.explanations.used, 1);
        assert_eq!(summary.explanations.remaining, Limit::Capped(2));
        assert_eq!(summary.explanations.limit.as_wire(), 3);
    }

    #[test]
    fn unlimited_wire_sentinel_is_minus_one() {
        assert_eq!(Limit::Unlimited.as_wire(), -1);
        assert_eq!(Limit::Capped(20).as_wire(), 20);
    }
}
