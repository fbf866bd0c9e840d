pub mod memory;
pub mod path_set;
pub mod tracked;
pub mod traits;
pub mod vpath;

pub use memory::MemoryStore;
pub use path_set::PathSet;
pub use tracked::TrackedFs;
pub use traits::{FileInfo, Storage, WalkEntry};
