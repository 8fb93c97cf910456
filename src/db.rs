pub mod store;
pub use store::{Collection, DocFilter, DocumentStore, Precondition, WriteBatch};
pub mod memory_store;
pub use memory_store::MemoryStore;
pub mod pg_store;
pub use pg_store::PgDocumentStore;
pub mod repository;
pub use repository::{Entity, Repository};
