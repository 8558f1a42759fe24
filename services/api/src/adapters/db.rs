//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` and `UsageStore` ports from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interview_prep_core::domain::{
    AuthSession, DailyCounter, InterviewSession, Question, QuestionAnswer, SubscriptionStatus,
    Tier, UsageRecord, User, UserCredentials,
};
use interview_prep_core::ports::{DatabaseService, PortError, PortResult, UsageStore};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` and `UsageStore` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    name: String,
    email: String,
    profile_image_url: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            profile_image_url: self.profile_image_url,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            id: self.id,
            user_id: self.user_id,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    role: String,
    experience: String,
    topics_to_focus: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> InterviewSession {
        InterviewSession {
            id: self.id,
            user_id: self.user_id,
            role: self.role,
            experience: self.experience,
            topics_to_focus: self.topics_to_focus,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    session_id: Uuid,
    question: String,
    answer: String,
    note: Option<String>,
    is_pinned: bool,
    created_at: DateTime<Utc>,
}
impl QuestionRecord {
    fn to_domain(self) -> Question {
        Question {
            id: self.id,
            session_id: self.session_id,
            question: self.question,
            answer: self.answer,
            note: self.note,
            is_pinned: self.is_pinned,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct UsageRow {
    user_id: Uuid,
    tier: String,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    subscription_status: Option<String>,
    subscription_end_date: Option<DateTime<Utc>>,
    sessions_count: i32,
    sessions_last_reset: DateTime<Utc>,
    explanations_count: i32,
    explanations_last_reset: DateTime<Utc>,
}
impl UsageRow {
    fn to_domain(self) -> UsageRecord {
        UsageRecord {
            user_id: self.user_id,
            tier: Tier::parse(&self.tier),
            stripe_customer_id: self.stripe_customer_id,
            stripe_subscription_id: self.stripe_subscription_id,
            subscription_status: self
                .subscription_status
                .as_deref()
                .and_then(SubscriptionStatus::parse),
            subscription_end_date: self.subscription_end_date,
            sessions: DailyCounter {
                count: self.sessions_count.max(0) as u32,
                last_reset: self.sessions_last_reset,
            },
            explanations: DailyCounter {
                count: self.explanations_count.max(0) as u32,
                last_reset: self.explanations_last_reset,
            },
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
        profile_image_url: Option<&str>,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (name, email, hashed_password, profile_image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING user_id, name, email, profile_image_url",
        )
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .bind(profile_image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("User with email {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, name, email, profile_image_url FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT id, user_id, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|_| PortError::Unauthorized)?;

        let session = record.to_domain();
        if session.expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        Ok(session.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_interview_session(
        &self,
        user_id: Uuid,
        role: &str,
        experience: &str,
        topics_to_focus: &str,
        description: Option<&str>,
    ) -> PortResult<InterviewSession> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "INSERT INTO interview_sessions (id, user_id, role, experience, topics_to_focus, description)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, user_id, role, experience, topics_to_focus, description, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(role)
        .bind(experience)
        .bind(topics_to_focus)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_interview_session(&self, session_id: Uuid) -> PortResult<InterviewSession> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, role, experience, topics_to_focus, description, created_at, updated_at
             FROM interview_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Session {} not found", session_id)))?;
        Ok(record.to_domain())
    }

    async fn get_sessions_by_user(&self, user_id: Uuid) -> PortResult<Vec<InterviewSession>> {
        let records = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, role, experience, topics_to_focus, description, created_at, updated_at
             FROM interview_sessions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_interview_session(&self, session_id: Uuid) -> PortResult<()> {
        // Questions cascade via the foreign key.
        let result = sqlx::query("DELETE FROM interview_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        Ok(())
    }

    async fn add_questions_to_session(
        &self,
        session_id: Uuid,
        questions: &[QuestionAnswer],
    ) -> PortResult<Vec<Question>> {
        let mut created = Vec::with_capacity(questions.len());
        for qa in questions {
            let record = sqlx::query_as::<_, QuestionRecord>(
                "INSERT INTO questions (id, session_id, question, answer)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, session_id, question, answer, note, is_pinned, created_at",
            )
            .bind(Uuid::new_v4())
            .bind(session_id)
            .bind(&qa.question)
            .bind(&qa.answer)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
            created.push(record.to_domain());
        }

        sqlx::query("UPDATE interview_sessions SET updated_at = now() WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(created)
    }

    async fn get_questions_for_session(&self, session_id: Uuid) -> PortResult<Vec<Question>> {
        let records = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, session_id, question, answer, note, is_pinned, created_at
             FROM questions WHERE session_id = $1
             ORDER BY is_pinned DESC, created_at DESC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_question_by_id(&self, question_id: Uuid) -> PortResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, session_id, question, answer, note, is_pinned, created_at
             FROM questions WHERE id = $1",
        )
        .bind(question_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Question {} not found", question_id)))?;
        Ok(record.to_domain())
    }

    async fn set_question_pinned(&self, question_id: Uuid, pinned: bool) -> PortResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(
            "UPDATE questions SET is_pinned = $1 WHERE id = $2
             RETURNING id, session_id, question, answer, note, is_pinned, created_at",
        )
        .bind(pinned)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Question {} not found", question_id)))?;
        Ok(record.to_domain())
    }

    async fn set_question_note(&self, question_id: Uuid, note: &str) -> PortResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(
            "UPDATE questions SET note = $1 WHERE id = $2
             RETURNING id, session_id, question, answer, note, is_pinned, created_at",
        )
        .bind(note)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, format!("Question {} not found", question_id)))?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// `UsageStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UsageStore for DbAdapter {
    async fn load_usage_record(&self, user_id: Uuid) -> PortResult<Option<UsageRecord>> {
        let row = sqlx::query_as::<_, UsageRow>(
            "SELECT user_id, tier, stripe_customer_id, stripe_subscription_id,
                    subscription_status, subscription_end_date,
                    sessions_count, sessions_last_reset,
                    explanations_count, explanations_last_reset
             FROM usage_records WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.map(UsageRow::to_domain))
    }

    async fn save_usage_record(&self, record: &UsageRecord) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO usage_records
                (user_id, tier, stripe_customer_id, stripe_subscription_id,
                 subscription_status, subscription_end_date,
                 sessions_count, sessions_last_reset,
                 explanations_count, explanations_last_reset)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (user_id) DO UPDATE SET
                tier = EXCLUDED.tier,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                subscription_status = EXCLUDED.subscription_status,
                subscription_end_date = EXCLUDED.subscription_end_date,
                sessions_count = EXCLUDED.sessions_count,
                sessions_last_reset = EXCLUDED.sessions_last_reset,
                explanations_count = EXCLUDED.explanations_count,
                explanations_last_reset = EXCLUDED.explanations_last_reset",
        )
        .bind(record.user_id)
        .bind(record.tier.as_str())
        .bind(record.stripe_customer_id.as_deref())
        .bind(record.stripe_subscription_id.as_deref())
        .bind(record.subscription_status.map(|s| s.as_str()))
        .bind(record.subscription_end_date)
        .bind(record.sessions.count as i32)
        .bind(record.sessions.last_reset)
        .bind(record.explanations.count as i32)
        .bind(record.explanations.last_reset)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
