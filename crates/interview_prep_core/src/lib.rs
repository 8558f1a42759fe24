pub mod domain;
pub mod extract;
pub mod ports;
pub mod usage;

pub use domain::{
    AuthSession, ConceptExplanation, DailyCounter, InterviewSession, Question, QuestionAnswer,
    ResourceKind, SubscriptionStatus, Tier, UsageRecord, User, UserCredentials,
};
pub use extract::{extract_concept_explanation, extract_question_answers, ExtractError};
pub use ports::{
    CheckoutSession, DatabaseService, ExplanationGenerationService, PaymentService, PortError,
    PortResult, ProviderSubscription, QuestionGenerationService, UsageStore,
};
pub use usage::{Limit, TierLimits, UsageDecision, UsageLedger, UsageSummary};
