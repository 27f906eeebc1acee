use std::path::Path;

use rand::Rng;
use tracing::error;

use crate::error::{GraphError, Result};
use crate::graph::{GraphReader, OpenOptions};
use crate::metadata::MetadataReader;
use crate::pipe_trick::resolve_pipe_trick;
use crate::PageId;

/// Wrapper around [`GraphReader`] and [`MetadataReader`], for tools that
/// need both. Also hosts the common utilities for parsing page references
/// and formatting output.
pub struct Reader {
    graph: GraphReader,
    metadata: MetadataReader,
}

impl Reader {
    /// Opens the graph file and its companion metadata database, which is
    /// found by replacing the graph file's extension with `.metadata`.
    pub fn open(graph_path: &Path) -> Result<Self> {
        Self::open_with_options(graph_path, OpenOptions::default())
    }

    pub fn open_with_options(graph_path: &Path, options: OpenOptions) -> Result<Self> {
        let graph = GraphReader::open_with_options(graph_path, options)?;
        let metadata_path = graph_path.with_extension("metadata");
        let metadata = MetadataReader::open(&metadata_path)?;
        Ok(Self { graph, metadata })
    }

    pub fn graph(&self) -> &GraphReader {
        &self.graph
    }

    pub fn metadata(&self) -> &MetadataReader {
        &self.metadata
    }

    pub fn is_valid_page_id(&self, id: PageId) -> bool {
        0 < id && id < self.graph.vertex_count()
    }

    /// Returns a random page id.
    ///
    /// To keep things interesting, this prefers pages with at least one
    /// incoming and one outgoing link; in particular, most redirect pages
    /// have no incoming links, so they cannot be the destination of a
    /// shortest path. Only 20 attempts are made, to bound the time taken;
    /// the last candidate is returned regardless.
    pub fn random_page_id(&self) -> PageId {
        let size = self.graph.vertex_count();
        if size < 2 {
            return 0;
        }
        let mut rng = rand::thread_rng();
        let mut result = 0;
        for _ in 0..20 {
            result = rng.gen_range(1..size);
            if self.graph.forward_edges(result).is_empty() {
                continue;
            }
            if self.graph.backward_edges(result).is_empty() {
                continue;
            }
            break;
        }
        result
    }

    /// Parses a page CLI argument into a valid page id.
    ///
    ///   `Title` resolves the page by title (case-sensitive);
    ///   `#123`  parses the page id as a number;
    ///   `?`     selects a random page.
    pub fn parse_page_argument(&self, arg: &str) -> Result<PageId> {
        if arg.is_empty() {
            return Err(GraphError::InvalidArgument(
                "empty page reference".into(),
            ));
        }

        if let Some(number) = arg.strip_prefix('#') {
            let id: i64 = number.parse().map_err(|_| {
                GraphError::InvalidArgument(format!("page id [{arg}] is malformed"))
            })?;
            let id = PageId::try_from(id).unwrap_or(0);
            if !self.is_valid_page_id(id) {
                return Err(GraphError::InvalidArgument(format!(
                    "page id [{arg}] is out of range"
                )));
            }
            return Ok(id);
        }

        if arg == "?" {
            let id = self.random_page_id();
            if id == 0 {
                return Err(GraphError::InvalidArgument("graph is empty".into()));
            }
            return Ok(id);
        }

        match self.metadata.page_by_title(arg)? {
            Some(page) => Ok(page.id),
            None => Err(GraphError::InvalidArgument(format!(
                "page with title [{arg}] not found (titles are case-sensitive)"
            ))),
        }
    }

    /// The title of the page, or `"untitled"` if the page is not found.
    pub fn page_title(&self, id: PageId) -> String {
        match self.metadata.page_by_id(id) {
            Ok(Some(page)) => page.title,
            Ok(None) => "untitled".to_owned(),
            Err(err) => {
                error!("failed to look up page {id}: {err}");
                "untitled".to_owned()
            }
        }
    }

    /// A page reference of the form `"#123 (Title)"`.
    pub fn page_ref(&self, id: PageId) -> String {
        format!("#{id} ({})", self.page_title(id))
    }

    /// The text the link from `from_page_id` to `to_page_id` is displayed
    /// as, or `"unknown"` if the link or the pages involved are missing.
    ///
    /// A stored display title is used verbatim (`[[Foo|Bar]]` shows
    /// "Bar"); an absent one falls back to the target title (`[[Foo]]`
    /// shows "Foo"); an empty one invokes the pipe trick
    /// (`[[Foo (bar)|]]` shows "Foo").
    pub fn link_text(&self, from_page_id: PageId, to_page_id: PageId) -> String {
        let link = match self.metadata.link(from_page_id, to_page_id) {
            Ok(Some(link)) => link,
            Ok(None) => return "unknown".to_owned(),
            Err(err) => {
                error!("failed to look up link {from_page_id}->{to_page_id}: {err}");
                return "unknown".to_owned();
            }
        };
        if let Some(title) = &link.title {
            if !title.is_empty() {
                return title.clone();
            }
        }
        let target = match self.metadata.page_by_id(to_page_id) {
            Ok(Some(page)) => page,
            _ => return "unknown".to_owned(),
        };
        match link.title {
            None => target.title,
            Some(_) => resolve_pipe_trick(&target.title).to_owned(),
        }
    }

    /// A reference to the target of a link, of the form `"#123 (Title)"`,
    /// or `"#123 (Title; displayed as: Text)"` when the link text differs
    /// from the target title.
    pub fn forward_link_ref(&self, from_page_id: PageId, to_page_id: PageId) -> String {
        let to_title = self.page_title(to_page_id);
        Self::format_link_ref(
            to_page_id,
            &to_title,
            &to_title,
            &self.link_text(from_page_id, to_page_id),
        )
    }

    /// Like [`forward_link_ref`](Self::forward_link_ref), but for
    /// backward links: `"#123 (FromTitle; displayed as: Text)"` means the
    /// page titled "FromTitle" links here with text "Text".
    pub fn backward_link_ref(&self, from_page_id: PageId, to_page_id: PageId) -> String {
        let from_title = self.page_title(from_page_id);
        let to_title = self.page_title(to_page_id);
        Self::format_link_ref(
            from_page_id,
            &from_title,
            &to_title,
            &self.link_text(from_page_id, to_page_id),
        )
    }

    pub(crate) fn format_link_ref(
        page_id: PageId,
        title: &str,
        link_target: &str,
        link_text: &str,
    ) -> String {
        if link_text != link_target {
            format!("#{page_id} ({title}; displayed as: {link_text})")
        } else {
            format!("#{page_id} ({title})")
        }
    }
}
