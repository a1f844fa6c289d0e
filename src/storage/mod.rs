pub mod memory;
pub mod reader;

pub use memory::MemoryReader;
pub use reader::{SpanReader, StorageError};
