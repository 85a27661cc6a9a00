pub mod access;
pub mod memory;
pub mod store;
pub mod supabase;

pub use memory::InMemoryStore;
pub use store::*;
pub use supabase::{SupabaseClient, SupabaseError, SupabaseStore};
