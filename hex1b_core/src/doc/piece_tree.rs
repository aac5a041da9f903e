//! A red-black tree of pieces, augmented with a cached left-subtree byte sum
//! (`left_bytes`) on every node, giving O(log n) offset-to-piece lookup, insertion,
//! and deletion over an ordered sequence of byte spans.
//!
//! Structural changes use a small set of primitives rather than reaching for a
//! generic keyed red-black tree: nodes are ordered purely by tree position (in-order
//! traversal order *is* document order), so "insert before/after a node" replaces
//! "insert by key", and range deletion collects surviving fragments and rebuilds a
//! balanced tree from them rather than running a keyed multi-delete.

use super::buffer::Source;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
  Red,
  Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
  pub source: Source,
  pub start: usize,
  pub length: usize,
}

#[derive(Debug, Clone)]
struct Node {
  piece: Piece,
  color: Color,
  parent: Option<NodeId>,
  left: Option<NodeId>,
  right: Option<NodeId>,
  /// Sum of `piece.length` over the entire left subtree. Spec-required cached
  /// aggregate; checked directly by the invariant tests.
  left_bytes: usize,
  /// Sum of `piece.length` over this node and its entire subtree. Private
  /// bookkeeping field (not part of the spec's node shape) that makes `left_bytes`
  /// recomputation O(1) per node instead of O(subtree size): a parent derives both
  /// its own `left_bytes` and `subtree_bytes` purely from its children's cached
  /// `subtree_bytes`.
  subtree_bytes: usize,
}

impl Node {
  fn leaf(piece: Piece, color: Color, parent: Option<NodeId>) -> Self {
    Node {
      piece,
      color,
      parent,
      left: None,
      right: None,
      left_bytes: 0,
      subtree_bytes: piece.length,
    }
  }
}

#[derive(Debug, Default)]
pub struct PieceTree {
  nodes: Vec<Node>,
  root: Option<NodeId>,
}

impl PieceTree {
  pub fn new() -> Self {
    PieceTree { nodes: Vec::new(), root: None }
  }

  pub fn is_empty(&self) -> bool {
    self.root.is_none()
  }

  pub fn total_bytes(&self) -> usize {
    self.root.map(|r| self.nodes[r].subtree_bytes).unwrap_or(0)
  }

  pub fn piece_count(&self) -> usize {
    self.nodes.len()
  }

  pub fn piece(&self, id: NodeId) -> Piece {
    self.nodes[id].piece
  }

  // -- color / child accessors tolerant of the `None` sentinel -----------------

  fn color_of(&self, id: Option<NodeId>) -> Color {
    id.map(|i| self.nodes[i].color).unwrap_or(Color::Black)
  }

  fn subtree_bytes_of(&self, id: Option<NodeId>) -> usize {
    id.map(|i| self.nodes[i].subtree_bytes).unwrap_or(0)
  }

  fn parent_of(&self, id: NodeId) -> Option<NodeId> {
    self.nodes[id].parent
  }

  // -- lookup --------------------------------------------------------------

  /// Walks from the root using cached `left_bytes`, returning `(node, offset_in_node)`
  /// such that the byte at `byte_offset` is the `offset_in_node`-th byte of that
  /// node's piece. Returns `None` iff the tree is empty or `byte_offset >= total`.
  pub fn find_at(&self, byte_offset: usize) -> Option<(NodeId, usize)> {
    let mut current = self.root?;
    let mut offset = byte_offset;
    loop {
      let node = &self.nodes[current];
      if offset < node.left_bytes {
        current = node.left?;
      } else if offset < node.left_bytes + node.piece.length {
        return Some((current, offset - node.left_bytes));
      } else {
        offset -= node.left_bytes + node.piece.length;
        current = node.right?;
      }
    }
  }

  /// The byte offset (in document order) at which `id`'s piece begins.
  fn start_offset_of(&self, id: NodeId) -> usize {
    let mut offset = self.nodes[id].left_bytes;
    let mut child = id;
    while let Some(parent) = self.nodes[child].parent {
      if self.nodes[parent].right == Some(child) {
        offset += self.nodes[parent].left_bytes + self.nodes[parent].piece.length;
      }
      child = parent;
    }
    offset
  }

  pub fn in_order(&self) -> Vec<Piece> {
    let mut out = Vec::with_capacity(self.nodes.len());
    self.in_order_from(self.root, &mut out);
    out
  }

  fn in_order_from(&self, id: Option<NodeId>, out: &mut Vec<Piece>) {
    let Some(id) = id else { return };
    self.in_order_from(self.nodes[id].left, out);
    out.push(self.nodes[id].piece);
    self.in_order_from(self.nodes[id].right, out);
  }

  fn minimum(&self, mut id: NodeId) -> NodeId {
    while let Some(l) = self.nodes[id].left {
      id = l;
    }
    id
  }

  fn maximum(&self, mut id: NodeId) -> NodeId {
    while let Some(r) = self.nodes[id].right {
      id = r;
    }
    id
  }

  fn rightmost(&self) -> Option<NodeId> {
    self.root.map(|r| self.maximum(r))
  }

  // -- aggregate maintenance -------------------------------------------------

  fn recompute_at(&mut self, id: NodeId) {
    let left = self.nodes[id].left;
    let right = self.nodes[id].right;
    let left_bytes = self.subtree_bytes_of(left);
    let right_bytes = self.subtree_bytes_of(right);
    let node = &mut self.nodes[id];
    node.left_bytes = left_bytes;
    node.subtree_bytes = left_bytes + node.piece.length + right_bytes;
  }

  /// Recomputes aggregates from `id` up to the root. Any structural change that
  /// isn't a pure rotation (attach, detach, in-place piece length change) must call
  /// this so every ancestor's `left_bytes` again equals the true subtree sum.
  fn recompute_up(&mut self, id: Option<NodeId>) {
    let mut current = id;
    while let Some(id) = current {
      self.recompute_at(id);
      current = self.parent_of(id);
    }
  }

  // -- rotations --------------------------------------------------------------

  /// Left-rotate at `x`. `x`'s right child `y` takes `x`'s place; `x` becomes `y`'s
  /// left child. Aggregates are restored by recomputing bottom-up (`x` then `y`),
  /// which is equivalent to the spec's closed-form update
  /// (`y.left_bytes += x.left_bytes + x.piece.length`) but avoids re-deriving that
  /// formula at every call site.
  fn left_rotate(&mut self, x: NodeId) {
    let y = self.nodes[x].right.expect("left_rotate requires a right child");
    let y_left = self.nodes[y].left;

    self.nodes[x].right = y_left;
    if let Some(yl) = y_left {
      self.nodes[yl].parent = Some(x);
    }

    let x_parent = self.nodes[x].parent;
    self.nodes[y].parent = x_parent;
    match x_parent {
      None => self.root = Some(y),
      Some(p) if self.nodes[p].left == Some(x) => self.nodes[p].left = Some(y),
      Some(p) => self.nodes[p].right = Some(y),
    }

    self.nodes[y].left = Some(x);
    self.nodes[x].parent = Some(y);

    self.recompute_at(x);
    self.recompute_at(y);
  }

  /// Right-rotate at `x`, the mirror image of [`Self::left_rotate`].
  fn right_rotate(&mut self, x: NodeId) {
    let y = self.nodes[x].left.expect("right_rotate requires a left child");
    let y_right = self.nodes[y].right;

    self.nodes[x].left = y_right;
    if let Some(yr) = y_right {
      self.nodes[yr].parent = Some(x);
    }

    let x_parent = self.nodes[x].parent;
    self.nodes[y].parent = x_parent;
    match x_parent {
      None => self.root = Some(y),
      Some(p) if self.nodes[p].left == Some(x) => self.nodes[p].left = Some(y),
      Some(p) => self.nodes[p].right = Some(y),
    }

    self.nodes[y].right = Some(x);
    self.nodes[x].parent = Some(y);

    self.recompute_at(x);
    self.recompute_at(y);
  }

  fn rotate_for_side(&mut self, x: NodeId, left_child: bool) {
    if left_child {
      self.left_rotate(x);
    } else {
      self.right_rotate(x);
    }
  }

  // -- insertion ---------------------------------------------------------------

  fn alloc(&mut self, piece: Piece, color: Color, parent: Option<NodeId>) -> NodeId {
    let id = self.nodes.len();
    self.nodes.push(Node::leaf(piece, color, parent));
    id
  }

  /// Attaches `piece` as the in-order predecessor of `target` (i.e. directly before
  /// it), then runs the insert fixup. Standard BST technique: if `target` has no left
  /// child, attach as `target`'s left child; otherwise attach as the right child of
  /// the rightmost node in `target`'s left subtree.
  fn insert_before(&mut self, target: NodeId, piece: Piece) -> NodeId {
    match self.nodes[target].left {
      None => {
        let id = self.alloc(piece, Color::Red, Some(target));
        self.nodes[target].left = Some(id);
        self.after_attach(id);
        id
      }
      Some(left) => {
        let pred = self.maximum(left);
        let id = self.alloc(piece, Color::Red, Some(pred));
        self.nodes[pred].right = Some(id);
        self.after_attach(id);
        id
      }
    }
  }

  /// Attaches `piece` as the in-order successor of `target`, mirroring
  /// [`Self::insert_before`].
  fn insert_after(&mut self, target: NodeId, piece: Piece) -> NodeId {
    match self.nodes[target].right {
      None => {
        let id = self.alloc(piece, Color::Red, Some(target));
        self.nodes[target].right = Some(id);
        self.after_attach(id);
        id
      }
      Some(right) => {
        let succ = self.minimum(right);
        let id = self.alloc(piece, Color::Red, Some(succ));
        self.nodes[succ].left = Some(id);
        self.after_attach(id);
        id
      }
    }
  }

  fn after_attach(&mut self, id: NodeId) {
    self.recompute_up(Some(id));
    self.insert_fixup(id);
  }

  fn insert_fixup(&mut self, mut z: NodeId) {
    while self.color_of(self.parent_of(z)) == Color::Red {
      let parent = self.parent_of(z).unwrap();
      let grandparent = self.parent_of(parent).unwrap(); // red parent is never the root
      if Some(parent) == self.nodes[grandparent].left {
        let uncle = self.nodes[grandparent].right;
        if self.color_of(uncle) == Color::Red {
          self.nodes[parent].color = Color::Black;
          self.nodes[uncle.unwrap()].color = Color::Black;
          self.nodes[grandparent].color = Color::Red;
          z = grandparent;
        } else {
          if self.nodes[parent].right == Some(z) {
            z = parent;
            self.left_rotate(z);
          }
          let parent = self.parent_of(z).unwrap();
          let grandparent = self.parent_of(parent).unwrap();
          self.nodes[parent].color = Color::Black;
          self.nodes[grandparent].color = Color::Red;
          self.right_rotate(grandparent);
        }
      } else {
        let uncle = self.nodes[grandparent].left;
        if self.color_of(uncle) == Color::Red {
          self.nodes[parent].color = Color::Black;
          self.nodes[uncle.unwrap()].color = Color::Black;
          self.nodes[grandparent].color = Color::Red;
          z = grandparent;
        } else {
          if self.nodes[parent].left == Some(z) {
            z = parent;
            self.right_rotate(z);
          }
          let parent = self.parent_of(z).unwrap();
          let grandparent = self.parent_of(parent).unwrap();
          self.nodes[parent].color = Color::Black;
          self.nodes[grandparent].color = Color::Red;
          self.left_rotate(grandparent);
        }
      }
      if Some(z) == self.root {
        break;
      }
    }
    self.nodes[self.root.unwrap()].color = Color::Black;
  }

  /// Inserts `length` bytes of `source` content starting at `start` (in that
  /// buffer), so that they land at document byte offset `byte_offset`.
  pub fn insert(&mut self, byte_offset: usize, source: Source, start: usize, length: usize) {
    if length == 0 {
      return;
    }
    let piece = Piece { source, start, length };

    let Some(root) = self.root else {
      let id = self.alloc(piece, Color::Black, None);
      self.root = Some(id);
      return;
    };

    if byte_offset >= self.total_bytes() {
      let tail = self.rightmost().unwrap_or(root);
      if self.nodes[tail].piece.source == source && self.nodes[tail].piece.start + self.nodes[tail].piece.length == start {
        self.nodes[tail].piece.length += length;
        self.recompute_up(Some(tail));
      } else {
        self.insert_after(tail, piece);
      }
      return;
    }

    let (target, offset_in_node) = self.find_at(byte_offset).expect("byte_offset already bounds-checked");
    if offset_in_node == 0 {
      self.insert_before(target, piece);
      return;
    }

    let target_piece = self.nodes[target].piece;
    let remainder_len = target_piece.length - offset_in_node;
    self.nodes[target].piece.length = offset_in_node;
    self.recompute_up(Some(target));

    let suffix = Piece {
      source: target_piece.source,
      start: target_piece.start + offset_in_node,
      length: remainder_len,
    };
    let new_id = self.insert_after(target, piece);
    self.insert_after(new_id, suffix);
  }

  // -- deletion ------------------------------------------------------------

  fn transplant(&mut self, u: NodeId, v: Option<NodeId>) {
    let u_parent = self.nodes[u].parent;
    match u_parent {
      None => self.root = v,
      Some(p) if self.nodes[p].left == Some(u) => self.nodes[p].left = v,
      Some(p) => self.nodes[p].right = v,
    }
    if let Some(v) = v {
      self.nodes[v].parent = u_parent;
    }
  }

  /// Removes a single node whose entire piece lies within the delete range.
  /// Standard CLRS red-black delete, adapted to `Option<NodeId>` in place of a
  /// sentinel `nil` node.
  fn remove_node(&mut self, z: NodeId) {
    let mut y = z;
    let mut y_original_color = self.nodes[y].color;
    let x: Option<NodeId>;
    let fixup_parent: Option<NodeId>;

    if self.nodes[z].left.is_none() {
      x = self.nodes[z].right;
      fixup_parent = self.nodes[z].parent;
      self.transplant(z, x);
    } else if self.nodes[z].right.is_none() {
      x = self.nodes[z].left;
      fixup_parent = self.nodes[z].parent;
      self.transplant(z, x);
    } else {
      y = self.minimum(self.nodes[z].right.unwrap());
      y_original_color = self.nodes[y].color;
      x = self.nodes[y].right;
      if self.nodes[y].parent == Some(z) {
        fixup_parent = Some(y);
        if let Some(x) = x {
          self.nodes[x].parent = Some(y);
        }
      } else {
        fixup_parent = self.nodes[y].parent;
        self.transplant(y, x);
        self.nodes[y].right = self.nodes[z].right;
        if let Some(r) = self.nodes[y].right {
          self.nodes[r].parent = Some(y);
        }
      }
      self.transplant(z, Some(y));
      self.nodes[y].left = self.nodes[z].left;
      if let Some(l) = self.nodes[y].left {
        self.nodes[l].parent = Some(y);
      }
      self.nodes[y].color = self.nodes[z].color;
    }

    self.recompute_up(fixup_parent.or(Some(y)));
    if y_original_color == Color::Black {
      self.delete_fixup(x, fixup_parent);
    }
  }

  fn delete_fixup(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
    while x != self.root && self.color_of(x) == Color::Black {
      let Some(p) = parent else { break };
      let is_left = self.nodes[p].left == x;
      if is_left {
        let mut sibling = self.nodes[p].right.expect("sibling must exist: black-height invariant");
        if self.color_of(Some(sibling)) == Color::Red {
          self.nodes[sibling].color = Color::Black;
          self.nodes[p].color = Color::Red;
          self.left_rotate(p);
          sibling = self.nodes[p].right.unwrap();
        }
        if self.color_of(self.nodes[sibling].left) == Color::Black && self.color_of(self.nodes[sibling].right) == Color::Black {
          self.nodes[sibling].color = Color::Red;
          x = Some(p);
          parent = self.parent_of(p);
        } else {
          if self.color_of(self.nodes[sibling].right) == Color::Black {
            if let Some(sl) = self.nodes[sibling].left {
              self.nodes[sl].color = Color::Black;
            }
            self.nodes[sibling].color = Color::Red;
            self.right_rotate(sibling);
            sibling = self.nodes[p].right.unwrap();
          }
          self.nodes[sibling].color = self.nodes[p].color;
          self.nodes[p].color = Color::Black;
          if let Some(sr) = self.nodes[sibling].right {
            self.nodes[sr].color = Color::Black;
          }
          self.left_rotate(p);
          x = self.root;
          parent = None;
        }
      } else {
        let mut sibling = self.nodes[p].left.expect("sibling must exist: black-height invariant");
        if self.color_of(Some(sibling)) == Color::Red {
          self.nodes[sibling].color = Color::Black;
          self.nodes[p].color = Color::Red;
          self.right_rotate(p);
          sibling = self.nodes[p].left.unwrap();
        }
        if self.color_of(self.nodes[sibling].right) == Color::Black && self.color_of(self.nodes[sibling].left) == Color::Black {
          self.nodes[sibling].color = Color::Red;
          x = Some(p);
          parent = self.parent_of(p);
        } else {
          if self.color_of(self.nodes[sibling].left) == Color::Black {
            if let Some(sr) = self.nodes[sibling].right {
              self.nodes[sr].color = Color::Black;
            }
            self.nodes[sibling].color = Color::Red;
            self.left_rotate(sibling);
            sibling = self.nodes[p].left.unwrap();
          }
          self.nodes[sibling].color = self.nodes[p].color;
          self.nodes[p].color = Color::Black;
          if let Some(sl) = self.nodes[sibling].left {
            self.nodes[sl].color = Color::Black;
          }
          self.right_rotate(p);
          x = self.root;
          parent = None;
        }
      }
    }
    if let Some(x) = x {
      self.nodes[x].color = Color::Black;
    }
  }

  /// Deletes `delete_length` bytes starting at `byte_offset`. Dispatches to the
  /// fast paths named in the spec before falling back to collect-and-rebuild for
  /// spans crossing more than one node.
  pub fn delete(&mut self, byte_offset: usize, delete_length: usize) {
    if delete_length == 0 || self.is_empty() {
      return;
    }
    let end_offset = byte_offset + delete_length;

    let Some((start_node, start_in_node)) = self.find_at(byte_offset) else { return };
    let start_node_begin = self.start_offset_of(start_node);
    let start_node_len = self.nodes[start_node].piece.length;

    if end_offset <= start_node_begin + start_node_len {
      // Entirely within one node.
      let end_in_node = end_offset - start_node_begin;
      if start_in_node == 0 && end_in_node == start_node_len {
        self.remove_node(start_node);
      } else if start_in_node == 0 {
        // Trim start: keep the suffix.
        let p = &mut self.nodes[start_node].piece;
        p.start += end_in_node;
        p.length -= end_in_node;
        self.recompute_up(Some(start_node));
      } else if end_in_node == start_node_len {
        // Trim end: keep the prefix.
        self.nodes[start_node].piece.length = start_in_node;
        self.recompute_up(Some(start_node));
      } else {
        // Split into surviving left + right fragments (fast path).
        let piece = self.nodes[start_node].piece;
        self.nodes[start_node].piece.length = start_in_node;
        self.recompute_up(Some(start_node));
        let right = Piece {
          source: piece.source,
          start: piece.start + end_in_node,
          length: piece.length - end_in_node,
        };
        self.insert_after(start_node, right);
      }
      return;
    }

    // General multi-node case: collect surviving fragments and rebuild.
    let mut survivors = Vec::new();
    let mut cursor = 0usize;
    for piece in self.in_order() {
      let piece_start = cursor;
      let piece_end = cursor + piece.length;
      cursor = piece_end;

      if piece_end <= byte_offset || piece_start >= end_offset {
        survivors.push(piece);
        continue;
      }
      if piece_start < byte_offset {
        let keep_len = byte_offset - piece_start;
        survivors.push(Piece { source: piece.source, start: piece.start, length: keep_len });
      }
      if piece_end > end_offset {
        let trim = end_offset - piece_start;
        survivors.push(Piece {
          source: piece.source,
          start: piece.start + trim,
          length: piece.length - trim,
        });
      }
    }
    self.rebuild_from(survivors);
  }

  /// Rebuilds the tree from an ordered list of surviving pieces as a perfectly
  /// balanced binary tree, coloring nodes on the single possibly-incomplete bottom
  /// level red and everything else black — the standard bulk-construction coloring
  /// that keeps a freshly built tree red-black valid without any rotations.
  fn rebuild_from(&mut self, pieces: Vec<Piece>) {
    self.nodes.clear();
    self.root = None;
    if pieces.is_empty() {
      return;
    }
    let n = pieces.len();
    let height = (usize::BITS - n.leading_zeros()) as u32; // ceil(log2(n+1))
    let ids: Vec<NodeId> = pieces
      .iter()
      .map(|p| {
        let id = self.nodes.len();
        self.nodes.push(Node::leaf(*p, Color::Black, None));
        id
      })
      .collect();
    self.root = Some(self.build_balanced(&ids, 0, n, height, None));
    // Bottom-up pass to fix every node's left_bytes/subtree_bytes from the leaves up.
    self.fix_aggregates_post_order(self.root);
  }

  fn build_balanced(&mut self, ids: &[NodeId], lo: usize, hi: usize, height: u32, parent: Option<NodeId>) -> NodeId {
    let mid = lo + (hi - lo) / 2;
    let id = ids[mid];
    self.nodes[id].parent = parent;
    // The deepest level (the only possibly-incomplete one) is colored red.
    let is_leaf = hi - lo == 1;
    self.nodes[id].color = if is_leaf && height > 1 { Color::Red } else { Color::Black };
    if lo < mid {
      let l = self.build_balanced(ids, lo, mid, height.saturating_sub(1), Some(id));
      self.nodes[id].left = Some(l);
    }
    if mid + 1 < hi {
      let r = self.build_balanced(ids, mid + 1, hi, height.saturating_sub(1), Some(id));
      self.nodes[id].right = Some(r);
    }
    id
  }

  fn fix_aggregates_post_order(&mut self, id: Option<NodeId>) {
    let Some(id) = id else { return };
    self.fix_aggregates_post_order(self.nodes[id].left);
    self.fix_aggregates_post_order(self.nodes[id].right);
    self.recompute_at(id);
  }

  // -- invariant checking (property tests) --------------------------------------

  #[cfg(test)]
  pub fn check_invariants(&self) -> Result<(), String> {
    let Some(root) = self.root else { return Ok(()) };
    if self.nodes[root].color != Color::Black {
      return Err("root is not black".into());
    }
    self.check_node(root)?;
    Ok(())
  }

  #[cfg(test)]
  fn check_node(&self, id: NodeId) -> Result<usize, String> {
    let node = &self.nodes[id];
    if node.piece.length == 0 {
      return Err(format!("node {id} has zero-length piece"));
    }
    if let Some(l) = node.left {
      if self.nodes[l].parent != Some(id) {
        return Err(format!("node {l} parent pointer inconsistent"));
      }
      if node.color == Color::Red && self.nodes[l].color == Color::Red {
        return Err(format!("red-red violation at {id}/{l}"));
      }
    }
    if let Some(r) = node.right {
      if self.nodes[r].parent != Some(id) {
        return Err(format!("node {r} parent pointer inconsistent"));
      }
      if node.color == Color::Red && self.nodes[r].color == Color::Red {
        return Err(format!("red-red violation at {id}/{r}"));
      }
    }
    let left_true_bytes = self.subtree_bytes_of(node.left);
    if left_true_bytes != node.left_bytes {
      return Err(format!(
        "node {id} left_bytes={} but true left subtree sum={}",
        node.left_bytes, left_true_bytes
      ));
    }
    let left_bh = match node.left {
      Some(l) => self.check_node(l)?,
      None => 1,
    };
    let right_bh = match node.right {
      Some(r) => self.check_node(r)?,
      None => 1,
    };
    if left_bh != right_bh {
      return Err(format!("black-height mismatch at node {id}: {left_bh} vs {right_bh}"));
    }
    Ok(left_bh + if node.color == Color::Black { 1 } else { 0 })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn text_of(tree: &PieceTree, original: &[u8], added: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for piece in tree.in_order() {
      let buf = match piece.source {
        Source::Original => original,
        Source::Added => added,
      };
      out.extend_from_slice(&buf[piece.start..piece.start + piece.length]);
    }
    out
  }

  #[test]
  fn splice_scenario_matches_text_and_byte_count() {
    let original = b"hello world".to_vec();
    let mut tree = PieceTree::new();
    tree.insert(0, Source::Original, 0, original.len());

    let mut added = Vec::new();
    let (s1, l1) = (added.len(), {
      added.extend_from_slice(b",");
      1
    });
    tree.insert(5, Source::Added, s1, l1);
    tree.check_invariants().unwrap();
    assert_eq!(text_of(&tree, &original, &added), b"hello, world");

    let (s2, l2) = (added.len(), {
      added.extend_from_slice(b"brave ");
      6
    });
    tree.insert(7, Source::Added, s2, l2);
    tree.check_invariants().unwrap();

    let text = text_of(&tree, &original, &added);
    assert_eq!(text, b"hello, brave world");
    assert_eq!(tree.total_bytes(), 18);
    // Two general-case splits each add two nodes (mutate + 2 new) to the initial
    // single piece, so five physical pieces back eighteen logical bytes here; no
    // adjacency condition lets any of them opportunistically merge.
    assert_eq!(tree.piece_count(), 5);

    let (node, offset_in_node) = tree.find_at(7).unwrap();
    let piece = tree.piece(node);
    assert_eq!(offset_in_node, 0);
    let bytes = match piece.source {
      Source::Original => &original[piece.start..piece.start + piece.length],
      Source::Added => &added[piece.start..piece.start + piece.length],
    };
    assert_eq!(bytes, b"brave ");
  }

  #[test]
  fn delete_within_single_node_fast_paths() {
    let mut tree = PieceTree::new();
    tree.insert(0, Source::Original, 0, 11); // "hello world"
    tree.delete(5, 1); // remove the space -> trim end of "hello", trim start of "world"... actually spans one node here
    tree.check_invariants().unwrap();
    let original = b"hello world".to_vec();
    assert_eq!(text_of(&tree, &original, &[]), b"helloworld");
  }

  #[test]
  fn delete_whole_node_removes_it() {
    let mut tree = PieceTree::new();
    tree.insert(0, Source::Original, 0, 5);
    tree.insert(5, Source::Original, 5, 5);
    tree.insert(10, Source::Original, 10, 5);
    tree.check_invariants().unwrap();
    assert_eq!(tree.piece_count(), 3);
    tree.delete(5, 5);
    tree.check_invariants().unwrap();
    assert_eq!(tree.piece_count(), 2);
    assert_eq!(tree.total_bytes(), 10);
  }

  #[test]
  fn delete_spanning_multiple_nodes_rebuilds() {
    let original = b"aaaaabbbbbccccc".to_vec();
    let mut tree = PieceTree::new();
    tree.insert(0, Source::Original, 0, 5);
    tree.insert(5, Source::Original, 5, 5);
    tree.insert(10, Source::Original, 10, 5);
    tree.delete(3, 9); // removes tail of first, all of second, head of third
    tree.check_invariants().unwrap();
    assert_eq!(text_of(&tree, &original, &[]), b"aaaccc");
  }

  #[test]
  fn random_insert_delete_matches_ground_truth() {
    // Small deterministic LCG so the property test is reproducible without adding
    // a dependency beyond the teacher's stack.
    struct Lcg(u64);
    impl Lcg {
      fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
      }
      fn below(&mut self, n: usize) -> usize {
        if n == 0 { 0 } else { (self.next() as usize) % n }
      }
    }

    let mut rng = Lcg(42);
    let mut ground_truth: Vec<u8> = b"the quick brown fox".to_vec();
    let mut added_buf: Vec<u8> = Vec::new();
    let mut tree = PieceTree::new();
    tree.insert(0, Source::Original, 0, ground_truth.len());

    for step in 0..300 {
      let do_insert = rng.below(2) == 0 || ground_truth.is_empty();
      if do_insert {
        let at = rng.below(ground_truth.len() + 1);
        let len = 1 + rng.below(5);
        let bytes: Vec<u8> = (0..len).map(|i| b'a' + ((step + i) % 26) as u8).collect();
        let start = added_buf.len();
        added_buf.extend_from_slice(&bytes);
        tree.insert(at, Source::Added, start, len);
        ground_truth.splice(at..at, bytes);
      } else {
        let at = rng.below(ground_truth.len());
        let max_len = ground_truth.len() - at;
        let len = 1 + rng.below(max_len);
        tree.delete(at, len);
        ground_truth.splice(at..at + len, std::iter::empty());
      }
      tree.check_invariants().unwrap();
      assert_eq!(tree.total_bytes(), ground_truth.len());
      let original = b"the quick brown fox".to_vec();
      assert_eq!(text_of(&tree, &original, &added_buf), ground_truth);
    }
  }

  #[test]
  fn find_at_out_of_range_returns_none() {
    let mut tree = PieceTree::new();
    tree.insert(0, Source::Original, 0, 3);
    assert!(tree.find_at(3).is_none());
    assert!(PieceTree::new().find_at(0).is_none());
  }
}
