pub mod analytics;
pub mod rag;
