//! The DAG produced by [`find_shortest_path_dag`], annotated with page
//! titles and link text loaded on demand through a [`Reader`].
//!
//! Supports efficient computation of the total path count, and efficient
//! enumeration of paths in lexicographical order starting at an
//! arbitrary offset.
//!
//! [`find_shortest_path_dag`]: crate::search::find_shortest_path_dag

mod enumerator;

pub use enumerator::PathEnumerator;

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::HashMap;

use crate::reader::Reader;
use crate::PageId;

/// The key outgoing links are sorted by during enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkOrder {
    /// Order links by target page id.
    #[default]
    Id,
    /// Order links by target page title.
    Title,
    /// Order links by link text.
    Text,
}

/// Identifies one link in an [`AnnotatedDag`]: the `index`-th outgoing
/// link of the page in slot `page`, in construction order (not in the
/// currently applied sort order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRef {
    page: u32,
    index: u32,
}

/// A page in the DAG. The title is resolved through the metadata store on
/// first access and memoized; once resolved it never changes.
struct AnnotatedPage {
    id: PageId,
    title: OnceCell<String>,
    links: Vec<AnnotatedLink>,
    /// Cached permutation of `links` for the most recently applied order.
    sorted: RefCell<SortCache>,
    /// Memoized number of paths from this page to the finish page;
    /// -1 while unknown.
    path_count: Cell<i64>,
}

struct AnnotatedLink {
    dst: u32,
    text: OnceCell<String>,
}

#[derive(Default)]
struct SortCache {
    order: Option<LinkOrder>,
    permutation: Vec<u32>,
}

/// A shortest-path DAG annotated with metadata.
///
/// Pages and links are identified by slot indices into internal tables,
/// which keeps the structure free of reference cycles; the edge list of
/// the underlying graph is translated once at construction time.
///
/// This type is thread-compatible but not thread-safe: the lazy metadata
/// cells are not synchronized.
pub struct AnnotatedDag<'r> {
    reader: &'r Reader,
    pages: Vec<AnnotatedPage>,
    start: u32,
    finish: u32,
}

impl<'r> AnnotatedDag<'r> {
    /// Builds the annotated DAG from the sorted edge list produced by the
    /// DAG search. `start` and `finish` get page slots even when they
    /// have no incident edges (the `start == finish` case).
    pub fn new(
        reader: &'r Reader,
        start_id: PageId,
        finish_id: PageId,
        edge_list: &[(PageId, PageId)],
    ) -> Self {
        let mut pages: Vec<AnnotatedPage> = Vec::new();
        let mut slot_by_id: HashMap<PageId, u32> = HashMap::new();
        let mut reserve = |id: PageId, pages: &mut Vec<AnnotatedPage>| -> u32 {
            *slot_by_id.entry(id).or_insert_with(|| {
                pages.push(AnnotatedPage {
                    id,
                    title: OnceCell::new(),
                    links: Vec::new(),
                    sorted: RefCell::new(SortCache::default()),
                    path_count: Cell::new(-1),
                });
                pages.len() as u32 - 1
            })
        };

        // Pass 1: reserve a slot for every unique page id, so that slot
        // indices are stable before any links refer to them.
        let start = reserve(start_id, &mut pages);
        let finish = reserve(finish_id, &mut pages);
        let mut slots = Vec::with_capacity(edge_list.len());
        for &(v, w) in edge_list {
            slots.push((reserve(v, &mut pages), reserve(w, &mut pages)));
        }

        // Pass 2: install the outgoing links.
        for (src, dst) in slots {
            pages[src as usize].links.push(AnnotatedLink {
                dst,
                text: OnceCell::new(),
            });
        }

        Self {
            reader,
            pages,
            start,
            finish,
        }
    }

    pub fn start_id(&self) -> PageId {
        self.pages[self.start as usize].id
    }

    pub fn finish_id(&self) -> PageId {
        self.pages[self.finish as usize].id
    }

    /// Counts the paths from start to finish without enumerating them.
    ///
    /// Counts are memoized per page, so the first call costs one
    /// traversal of the DAG and later calls are free. The count can be
    /// astronomically large; it is reported as a saturating best-effort
    /// `i64`.
    pub fn count_paths(&self) -> i64 {
        self.path_count(self.start)
    }

    /// Enumerates paths from start to finish, skipping the first `offset`
    /// paths in the given order.
    ///
    /// For each path, `callback` receives the links from start to finish
    /// and returns whether to continue. Returns `false` if the callback
    /// ever returned `false`, and `true` otherwise (including when there
    /// was nothing to enumerate).
    ///
    /// This is the recursive enumerator: it shares one link stack across
    /// the traversal and never copies per-page link lists, which makes
    /// the first path cheap. The sort order must not be changed from
    /// inside the callback; use [`PathEnumerator`] for that.
    pub fn enumerate_paths<F>(&self, callback: F, offset: i64, order: LinkOrder) -> bool
    where
        F: FnMut(&[LinkRef]) -> bool,
    {
        let mut context = EnumerateContext {
            dag: self,
            callback,
            offset,
            order,
            links: Vec::new(),
        };
        context.run(self.start)
    }

    /// The id of the page the link points to.
    pub fn link_dst_id(&self, link: LinkRef) -> PageId {
        self.pages[self.link(link).dst as usize].id
    }

    /// The id of the page the link originates from.
    pub fn link_src_id(&self, link: LinkRef) -> PageId {
        self.pages[link.page as usize].id
    }

    /// The text the link is displayed as, resolved and memoized on first
    /// access.
    pub fn link_text(&self, link: LinkRef) -> &str {
        let src_id = self.link_src_id(link);
        let annotated = self.link(link);
        let dst_id = self.pages[annotated.dst as usize].id;
        annotated
            .text
            .get_or_init(|| self.reader.link_text(src_id, dst_id))
    }

    /// The title of the page the link points to, resolved and memoized on
    /// first access.
    pub fn link_dst_title(&self, link: LinkRef) -> &str {
        self.title(self.link(link).dst)
    }

    /// Formats the link the way it appears when following it forward:
    /// `"#<dst> (<dst title>)"`, with `"; displayed as: <text>"` appended
    /// when the link text differs from the target title.
    pub fn forward_ref(&self, link: LinkRef) -> String {
        let title = self.link_dst_title(link).to_owned();
        Reader::format_link_ref(self.link_dst_id(link), &title, &title, self.link_text(link))
    }

    /// Formats the link as seen from the target page:
    /// `"#<src> (<src title>)"`, with the display text appended when it
    /// differs from the target title.
    pub fn backward_ref(&self, link: LinkRef) -> String {
        let src_title = self.title(link.page).to_owned();
        let dst_title = self.link_dst_title(link).to_owned();
        Reader::format_link_ref(
            self.link_src_id(link),
            &src_title,
            &dst_title,
            self.link_text(link),
        )
    }

    /// `"#<id> (<title>)"` for the start page.
    pub fn start_ref(&self) -> String {
        format!("#{} ({})", self.start_id(), self.title(self.start))
    }

    pub(crate) fn start_slot(&self) -> u32 {
        self.start
    }

    pub(crate) fn finish_slot(&self) -> u32 {
        self.finish
    }

    pub(crate) fn link_dst_slot(&self, link: LinkRef) -> u32 {
        self.link(link).dst
    }

    pub(crate) fn link_count(&self, slot: u32) -> usize {
        self.pages[slot as usize].links.len()
    }

    /// The `i`-th outgoing link of `slot` under `order`, or `None` when
    /// `i` is past the end. Sorting is lazy: the permutation for `order`
    /// is computed on first use and cached until a different order is
    /// requested.
    pub(crate) fn sorted_link(&self, slot: u32, order: LinkOrder, i: usize) -> Option<LinkRef> {
        if i >= self.link_count(slot) {
            return None;
        }
        self.ensure_sorted(slot, order);
        let cache = self.pages[slot as usize].sorted.borrow();
        cache.permutation.get(i).map(|&index| LinkRef {
            page: slot,
            index,
        })
    }

    /// Number of paths from `slot` to the finish page, memoized.
    pub(crate) fn path_count(&self, slot: u32) -> i64 {
        let page = &self.pages[slot as usize];
        let cached = page.path_count.get();
        if cached >= 0 {
            return cached;
        }
        let count = if slot == self.finish {
            1
        } else {
            page.links
                .iter()
                .map(|link| self.path_count(link.dst))
                .fold(0i64, i64::saturating_add)
        };
        page.path_count.set(count);
        count
    }

    fn link(&self, link: LinkRef) -> &AnnotatedLink {
        &self.pages[link.page as usize].links[link.index as usize]
    }

    fn title(&self, slot: u32) -> &str {
        let page = &self.pages[slot as usize];
        page.title.get_or_init(|| self.reader.page_title(page.id))
    }

    fn ensure_sorted(&self, slot: u32, order: LinkOrder) {
        let page = &self.pages[slot as usize];
        if page.sorted.borrow().order == Some(order) {
            return;
        }
        let mut permutation: Vec<u32> = (0..page.links.len() as u32).collect();
        match order {
            LinkOrder::Id => {
                permutation.sort_by_key(|&i| self.pages[page.links[i as usize].dst as usize].id);
            }
            LinkOrder::Title => {
                permutation.sort_by(|&a, &b| {
                    let ta = self.title(page.links[a as usize].dst);
                    let tb = self.title(page.links[b as usize].dst);
                    ta.cmp(tb)
                });
            }
            LinkOrder::Text => {
                permutation.sort_by(|&a, &b| {
                    let ta = self.link_text(LinkRef { page: slot, index: a });
                    let tb = self.link_text(LinkRef { page: slot, index: b });
                    ta.cmp(tb)
                });
            }
        }
        *page.sorted.borrow_mut() = SortCache {
            order: Some(order),
            permutation,
        };
    }
}

struct EnumerateContext<'a, 'r, F> {
    dag: &'a AnnotatedDag<'r>,
    callback: F,
    offset: i64,
    order: LinkOrder,
    links: Vec<LinkRef>,
}

impl<F: FnMut(&[LinkRef]) -> bool> EnumerateContext<'_, '_, F> {
    fn run(&mut self, slot: u32) -> bool {
        if slot == self.dag.finish_slot() {
            return if self.offset == 0 {
                (self.callback)(&self.links)
            } else {
                true
            };
        }
        let mut i = 0;
        while let Some(link) = self.dag.sorted_link(slot, self.order, i) {
            i += 1;
            let dst = self.dag.link_dst_slot(link);
            if self.offset > 0 {
                let subtree = self.dag.path_count(dst);
                if subtree <= self.offset {
                    // The whole subtree is consumed by the offset; skip
                    // it without descending.
                    self.offset -= subtree;
                    continue;
                }
            }
            self.links.push(link);
            if !self.run(dst) {
                return false;
            }
            self.links.pop();
        }
        true
    }
}
