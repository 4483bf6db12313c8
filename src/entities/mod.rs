//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod cache_entry;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use cache_entry::{Column as CacheEntryColumn, Entity as CacheEntry, Model as CacheEntryModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
