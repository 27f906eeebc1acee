use crate::dag::{AnnotatedDag, LinkOrder, LinkRef};

/// Iterative path enumerator over an [`AnnotatedDag`].
///
/// Unlike [`AnnotatedDag::enumerate_paths`], which drives a callback,
/// this keeps explicit state between calls: an alternatives stack with
/// one frame per path edge, and the current path. Each frame owns a copy
/// of its page's ordered links, so the sort order may be changed between
/// calls without invalidating paths already on the stack; the new order
/// applies to pages entered afterwards.
///
/// [`advance_by`](Self::advance_by) jumps forward using memoized subtree
/// counts, so skipping any number of paths costs at most one descent.
pub struct PathEnumerator<'a, 'r> {
    dag: &'a AnnotatedDag<'r>,
    order: LinkOrder,
    stack: Vec<Frame>,
    path: Vec<LinkRef>,
    has_path: bool,
}

/// One pending choice: the ordered alternatives of a page, and which of
/// them is currently taken.
struct Frame {
    links: Vec<LinkRef>,
    pos: usize,
}

impl<'a, 'r> PathEnumerator<'a, 'r> {
    /// Positions the enumerator on the first path at `offset` (0-based)
    /// in the given order. If the DAG holds fewer paths, `has_path()` is
    /// false.
    pub fn new(dag: &'a AnnotatedDag<'r>, offset: i64, order: LinkOrder) -> Self {
        let mut enumerator = Self {
            dag,
            order,
            stack: Vec::new(),
            path: Vec::new(),
            has_path: false,
        };
        enumerator.has_path = enumerator.descend(dag.start_slot(), offset);
        enumerator
    }

    /// Whether the enumerator is currently positioned on a path.
    pub fn has_path(&self) -> bool {
        self.has_path
    }

    /// The current path as a list of links from start to finish. Empty
    /// when start equals finish, or when `has_path()` is false.
    pub fn path(&self) -> &[LinkRef] {
        &self.path
    }

    pub fn order(&self) -> LinkOrder {
        self.order
    }

    /// Changes the order used for pages entered by later advances.
    pub fn set_order(&mut self, order: LinkOrder) {
        self.order = order;
    }

    /// Moves to the next path, if any.
    pub fn advance(&mut self) {
        self.advance_by(0);
    }

    /// Skips `skip` paths beyond the current one and positions the
    /// enumerator on the path after them; `advance_by(0)` is `advance()`.
    /// Whole subtrees are skipped via their path counts, without
    /// descending into them.
    pub fn advance_by(&mut self, mut skip: i64) {
        while let Some(mut frame) = self.stack.pop() {
            self.path.pop();
            frame.pos += 1;
            while frame.pos < frame.links.len() {
                let link = frame.links[frame.pos];
                let dst = self.dag.link_dst_slot(link);
                let subtree = self.dag.path_count(dst);
                if skip < subtree {
                    self.path.push(link);
                    self.stack.push(frame);
                    self.has_path = self.descend(dst, skip);
                    debug_assert!(self.has_path);
                    return;
                }
                skip -= subtree;
                frame.pos += 1;
            }
        }
        self.has_path = false;
        self.path.clear();
    }

    /// Descends from `slot` toward the finish, choosing at every page the
    /// first alternative whose subtree is not wholly consumed by `skip`.
    ///
    /// Returns false only when `skip` is not smaller than the number of
    /// paths below `slot`, which can happen just for the initial offset:
    /// later calls pass a remainder that is known to fit.
    fn descend(&mut self, mut slot: u32, mut skip: i64) -> bool {
        loop {
            if slot == self.dag.finish_slot() {
                return skip == 0;
            }
            let links = self.collect_links(slot);
            let mut pos = 0;
            let next = loop {
                let Some(&link) = links.get(pos) else {
                    // Only reachable on the first iteration, with the
                    // stack exactly as the caller left it.
                    return false;
                };
                let dst = self.dag.link_dst_slot(link);
                let subtree = self.dag.path_count(dst);
                if skip < subtree {
                    break dst;
                }
                skip -= subtree;
                pos += 1;
            };
            self.path.push(links[pos]);
            self.stack.push(Frame { links, pos });
            slot = next;
        }
    }

    fn collect_links(&self, slot: u32) -> Vec<LinkRef> {
        let mut links = Vec::with_capacity(self.dag.link_count(slot));
        let mut i = 0;
        while let Some(link) = self.dag.sorted_link(slot, self.order, i) {
            links.push(link);
            i += 1;
        }
        links
    }
}
