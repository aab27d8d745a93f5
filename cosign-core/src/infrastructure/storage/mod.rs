pub mod memory;
pub mod traits;

pub use memory::MemoryPoolStore;
pub use traits::*;
