pub mod manager;
pub mod memory;
pub mod pg_store;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use repository::{HierarchyRepository, NewShop, NewUser, Page, ShopChanges, UserChanges, UserFilter};
