pub mod db;
pub mod text_llm;

pub use db::PgRecordStore;
pub use text_llm::OpenAiTextAdapter;
