//! `SessionStore` adapters.

mod json_dir;
mod memory;

pub use json_dir::JsonDirSessionStore;
pub use memory::InMemorySessionStore;
