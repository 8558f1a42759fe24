pub mod db;
pub mod explain_llm;
pub mod question_llm;
pub mod stripe;

pub use db::DbAdapter;
pub use explain_llm::OpenAiExplainAdapter;
pub use question_llm::OpenAiQuestionAdapter;
pub use stripe::StripeAdapter;
