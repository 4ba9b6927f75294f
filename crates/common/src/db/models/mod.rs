//! SeaORM entity models
//!
//! The content store is owned by the content-management side; this service
//! only reads from it.

mod search_content;

pub use search_content::Entity as SearchContentEntity;
