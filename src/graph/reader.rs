use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::graph::header::{Header, HEADER_LEN};
use crate::PageId;

/// How the mapped graph file is pinned into physical memory.
///
/// Pinning increases open time and persistent memory usage, but removes
/// page-fault latency from searches. It only pays off for long-running
/// processes that serve many queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemoryLock {
    /// Demand-paged; nothing is pinned.
    #[default]
    None,
    /// Lock all pages before `open` returns; open fails if the OS refuses.
    Foreground,
    /// Lock pages from a detached worker thread; open returns immediately
    /// and a lock failure is ignored.
    Background,
    /// Ask the OS to pre-populate the mapping without pinning it.
    Populate,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    pub memory_lock: MemoryLock,
}

/// Word offsets of one CSR block within the mapped file.
#[derive(Debug, Clone, Copy)]
struct CsrBlock {
    index: usize,
    edges: usize,
}

/// Read-only accessor for the graph file. The whole file is mapped into
/// memory and adjacency queries return slices of the mapping, so lookups
/// never copy. This type is cheap to share between threads.
///
/// Beyond the header magic and the file size, the contents are not
/// validated; a corrupt file produces garbage adjacency, not undefined
/// behavior, because all offsets are bounds-checked on access.
pub struct GraphReader {
    mmap: Arc<Mmap>,
    vertex_count: u32,
    edge_count: u32,
    forward: CsrBlock,
    backward: CsrBlock,
}

impl GraphReader {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(path, OpenOptions::default())
    }

    pub fn open_with_options(path: &Path, options: OpenOptions) -> Result<Self> {
        let file = File::open(path)?;

        let mut header_bytes = [0u8; HEADER_LEN];
        (&file).read_exact(&mut header_bytes)?;
        let header = Header::decode(&header_bytes)?;

        let file_len = file.metadata()?.len();
        if file_len != header.file_size() {
            return Err(GraphError::Format(format!(
                "file size is {file_len} bytes, header implies {}",
                header.file_size()
            )));
        }

        let mmap = unsafe {
            // Safety: the file is opened read-only and the mapping is
            // never written through. Concurrent truncation of the file
            // would be an external contract violation.
            let mut mmap_options = MmapOptions::new();
            #[cfg(target_os = "linux")]
            if options.memory_lock == MemoryLock::Populate {
                mmap_options.populate();
            }
            mmap_options.map(&file)?
        };
        let mmap = Arc::new(mmap);

        match options.memory_lock {
            MemoryLock::None | MemoryLock::Populate => {}
            MemoryLock::Foreground => {
                #[cfg(unix)]
                mmap.lock()?;
                #[cfg(not(unix))]
                return Err(GraphError::UnsupportedFeature("memory locking"));
            }
            MemoryLock::Background => {
                #[cfg(unix)]
                {
                    // The worker owns its own handle to the mapping and
                    // never touches reader state.
                    let mmap = Arc::clone(&mmap);
                    std::thread::Builder::new()
                        .name("graph-mlock".into())
                        .spawn(move || {
                            if let Err(err) = mmap.lock() {
                                debug!("background memory lock failed: {err}");
                            }
                        })?;
                }
                #[cfg(not(unix))]
                debug!("background memory lock is not supported on this platform");
            }
        }

        let vc1 = header.vertex_count as usize + 1;
        let ec = header.edge_count as usize;
        let reader = Self {
            mmap,
            vertex_count: header.vertex_count,
            edge_count: header.edge_count,
            forward: CsrBlock {
                index: HEADER_LEN / 4,
                edges: HEADER_LEN / 4 + vc1,
            },
            backward: CsrBlock {
                index: HEADER_LEN / 4 + vc1 + ec,
                edges: HEADER_LEN / 4 + vc1 + ec + vc1,
            },
        };

        let words = reader.words();
        debug_assert_eq!(words[reader.forward.index], 0);
        debug_assert_eq!(words[reader.forward.index + reader.vertex_count as usize], reader.edge_count);
        debug_assert_eq!(words[reader.backward.index], 0);
        debug_assert_eq!(words[reader.backward.index + reader.vertex_count as usize], reader.edge_count);

        Ok(reader)
    }

    /// Number of vertices, including the reserved vertex 0.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of edges in one direction; forward and backward edges
    /// combined are twice this number.
    pub fn edge_count(&self) -> u32 {
        self.edge_count
    }

    /// Outgoing neighbors of `v`, sorted ascending.
    ///
    /// Panics if `v >= vertex_count()`.
    pub fn forward_edges(&self, v: PageId) -> &[u32] {
        self.edges(self.forward, v)
    }

    /// Incoming neighbors of `v`, sorted ascending.
    ///
    /// Panics if `v >= vertex_count()`.
    pub fn backward_edges(&self, v: PageId) -> &[u32] {
        self.edges(self.backward, v)
    }

    fn edges(&self, block: CsrBlock, v: PageId) -> &[u32] {
        assert!(v < self.vertex_count, "vertex id out of range");
        let words = self.words();
        let begin = words[block.index + v as usize] as usize;
        let end = words[block.index + v as usize + 1] as usize;
        &words[block.edges + begin..block.edges + end]
    }

    fn words(&self) -> &[u32] {
        // Safety: any bit pattern is a valid u32. The mapping is
        // page-aligned and the file size is a multiple of four, so both
        // the head and tail of the split are empty.
        let (head, words, tail) = unsafe { self.mmap.align_to::<u32>() };
        debug_assert!(head.is_empty() && tail.is_empty());
        words
    }
}
