//! Store adapters and the task pipeline built on them

pub mod graph_handler;
pub mod manager;
pub mod vector_handler;

pub use graph_handler::GraphStoreHandler;
pub use manager::StoreManager;
pub use vector_handler::{VectorStoreHandler, DEFAULT_SEARCH_LIMIT};
