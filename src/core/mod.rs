pub mod llm;
pub mod vector_store;
