pub mod json_file;
pub mod memory;
pub mod traits;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, StoreFuture, load_json, save_json};
