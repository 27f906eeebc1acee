mod header;
mod reader;
mod writer;

pub use header::{Header, GRAPH_MAGIC, HEADER_LEN};
pub use reader::{GraphReader, MemoryLock, OpenOptions};
pub use writer::{derive_backward_edges, write_graph_file};
