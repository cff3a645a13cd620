//! Balanced line tree with offset/line translation.
//!
//! A [`LineIndex`] is an immutable value: [`LineIndex::edit`] returns a new
//! index that shares every untouched subtree with the old one, so older
//! versions stay valid for as long as someone holds them.
//!
//! Offsets count chars (Unicode scalar values). Lines and columns are
//! zero-based, and only `\n` terminates a line.

use std::fmt;
use std::sync::Arc;

use super::lines::{char_len, char_to_byte, split_lines};
use super::node::{Node, group, root_from};
use super::position::Position;

/// Maximum children per interior node unless configured otherwise.
pub const DEFAULT_NODE_CAPACITY: usize = 4;

/// Start offset and full text (terminator included) of one line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineInfo<'a> {
    pub offset: usize,
    pub text: &'a str,
}

#[derive(Clone)]
pub struct LineIndex {
    root: Arc<Node>,
    capacity: usize,
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::empty(DEFAULT_NODE_CAPACITY)
    }
}

impl fmt::Debug for LineIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineIndex")
            .field("chars", &self.len())
            .field("lines", &self.line_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Which part of a node's line range an edit touches.
enum Section {
    /// Entirely before or after the edited lines; reused as is.
    Untouched,
    /// Strictly inside the edited lines; dropped.
    Inside,
    /// Holds the first edited line or straddles the last one; rebuilt.
    Boundary,
}

fn section(first: usize, count: usize, edit_first: usize, edit_last: usize) -> Section {
    let last = first + count - 1;
    if last < edit_first || first > edit_last {
        Section::Untouched
    } else if first > edit_first && last <= edit_last {
        Section::Inside
    } else {
        Section::Boundary
    }
}

impl LineIndex {
    pub fn empty(capacity: usize) -> Self {
        Self {
            root: Node::empty(),
            capacity: capacity.max(2),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::with_capacity(text, DEFAULT_NODE_CAPACITY)
    }

    pub fn with_capacity(text: &str, capacity: usize) -> Self {
        Self::load(split_lines(text), capacity)
    }

    /// Build an index bottom-up from pre-split lines.
    ///
    /// Every line except the last must end with `\n`, as produced by
    /// [`split_lines`]. Empty lines are skipped.
    pub fn load(lines: Vec<String>, capacity: usize) -> Self {
        let capacity = capacity.max(2);
        let leaves = lines
            .into_iter()
            .filter(|line| !line.is_empty())
            .map(Node::leaf)
            .collect();
        Self {
            root: root_from(leaves, capacity),
            capacity,
        }
    }

    /// Total number of chars.
    pub fn len(&self) -> usize {
        self.root.chars()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored lines. A trailing `\n` does not start a new line.
    pub fn line_count(&self) -> usize {
        self.root.lines()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node: &Node = &self.root;
        while let Some(first) = node.children().first() {
            depth += 1;
            node = &**first;
        }
        depth
    }

    pub fn lines(&self) -> Lines<'_> {
        Lines {
            stack: vec![self.root.children().iter()],
        }
    }

    pub fn text(&self) -> String {
        self.lines().collect()
    }

    /// Start offset of every line, in order.
    pub fn line_start_offsets(&self) -> Vec<usize> {
        self.lines()
            .scan(0, |offset, line| {
                let start = *offset;
                *offset += char_len(line);
                Some(start)
            })
            .collect()
    }

    /// Text of `[start, start + length)`, clamped to the document.
    pub fn get_text(&self, start: usize, length: usize) -> String {
        let len = self.len();
        if length == 0 || start >= len {
            return String::new();
        }
        let end = start.saturating_add(length).min(len);
        let mut out = String::new();
        collect_range(&self.root, 0, start, end, &mut out);
        out
    }

    /// Locate `line`. Past the last line this yields the document length
    /// and an empty text.
    pub fn line_number_to_info(&self, line: usize) -> LineInfo<'_> {
        let past_end = LineInfo {
            offset: self.len(),
            text: "",
        };
        if line >= self.line_count() {
            return past_end;
        }

        let mut node: &Node = &self.root;
        let mut offset = 0;
        let mut remaining = line;
        loop {
            match node {
                Node::Leaf { text, .. } => {
                    return LineInfo {
                        offset,
                        text: &**text,
                    };
                }
                Node::Branch { children, .. } => {
                    let mut next = None;
                    for child in children {
                        if remaining < child.lines() {
                            next = Some(child);
                            break;
                        }
                        remaining -= child.lines();
                        offset += child.chars();
                    }
                    match next {
                        Some(child) => node = &**child,
                        None => return past_end,
                    }
                }
            }
        }
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        (line < self.line_count()).then(|| self.line_number_to_info(line).text)
    }

    /// Translate a char offset (clamped to the document) to a position.
    ///
    /// The end of a document whose last line is terminated maps to column 0
    /// of the line after it.
    pub fn char_offset_to_line_and_pos(&self, offset: usize) -> Position {
        let offset = offset.min(self.len());
        if let Some((line, start, _)) = self.leaf_at(offset) {
            return Position::new(line, offset - start);
        }
        match self.last_leaf() {
            None => Position::default(),
            Some((line, _, text)) if text.ends_with('\n') => Position::new(line + 1, 0),
            Some((line, start, _)) => Position::new(line, offset - start),
        }
    }

    /// Translate a position to a char offset. Columns past the end of the
    /// line clamp to just before its terminator.
    pub fn position_to_offset(&self, position: Position) -> usize {
        let info = self.line_number_to_info(position.line);
        let content = info.text.strip_suffix('\n').unwrap_or(info.text);
        info.offset + position.character.min(char_len(content))
    }

    /// Replace `delete_len` chars at `pos` with `insert`, returning the new
    /// index. Out-of-range arguments are clamped; `self` is left untouched.
    pub fn edit(&self, pos: usize, delete_len: usize, insert: &str) -> LineIndex {
        let len = self.len();
        let pos = pos.min(len);
        let delete_len = delete_len.min(len - pos);
        if delete_len == 0 && insert.is_empty() {
            return self.clone();
        }

        let (Some(first), Some(last)) = (self.locate(pos), self.locate(pos + delete_len)) else {
            return Self::with_capacity(insert, self.capacity);
        };
        let (first_line, first_start, first_text) = first;
        let (last_line, last_start, last_text) = last;

        // The rewritten region spans whole leaves: the part of the first
        // leaf before the edit, the insertion, and the rest of the last leaf.
        // An edit ending exactly on a line boundary pulls in the next line.
        let head = &first_text[..char_to_byte(first_text, pos - first_start)];
        let tail = &last_text[char_to_byte(last_text, pos + delete_len - last_start)..];
        let mut replacement = String::with_capacity(head.len() + insert.len() + tail.len());
        replacement.push_str(head);
        replacement.push_str(insert);
        replacement.push_str(tail);

        let mut leaves = Some(
            split_lines(&replacement)
                .into_iter()
                .map(Node::leaf)
                .collect::<Vec<_>>(),
        );
        let nodes = splice(
            &self.root,
            0,
            (first_line, last_line),
            &mut leaves,
            self.capacity,
        );
        LineIndex {
            root: root_from(nodes, self.capacity),
            capacity: self.capacity,
        }
    }

    /// Leaf containing `offset`, as (line, leaf start, text).
    fn leaf_at(&self, offset: usize) -> Option<(usize, usize, &str)> {
        if offset >= self.len() {
            return None;
        }
        let mut node: &Node = &self.root;
        let mut line = 0;
        let mut start = 0;
        loop {
            match node {
                Node::Leaf { text, .. } => return Some((line, start, &**text)),
                Node::Branch { children, .. } => {
                    let mut next = None;
                    for child in children {
                        if offset - start < child.chars() {
                            next = Some(child);
                            break;
                        }
                        start += child.chars();
                        line += child.lines();
                    }
                    node = &**next?;
                }
            }
        }
    }

    fn last_leaf(&self) -> Option<(usize, usize, &str)> {
        let mut node: &Node = &self.root;
        while let Some(last) = node.children().last() {
            node = &**last;
        }
        let text = node.text()?;
        Some((self.line_count() - 1, self.len() - char_len(text), text))
    }

    /// Like `leaf_at`, but the document end resolves to the last leaf.
    fn locate(&self, offset: usize) -> Option<(usize, usize, &str)> {
        self.leaf_at(offset).or_else(|| self.last_leaf())
    }
}

fn collect_range(node: &Node, node_start: usize, start: usize, end: usize, out: &mut String) {
    match node {
        Node::Leaf { text, chars } => {
            let from = start.saturating_sub(node_start);
            let to = (end - node_start).min(*chars);
            out.push_str(&text[char_to_byte(text, from)..char_to_byte(text, to)]);
        }
        Node::Branch { children, .. } => {
            let mut child_start = node_start;
            for child in children {
                let child_end = child_start + child.chars();
                if child_end > start && child_start < end {
                    collect_range(child, child_start, start, end, out);
                }
                if child_end >= end {
                    break;
                }
                child_start = child_end;
            }
        }
    }
}

/// Rebuild `node` with lines `edit.0..=edit.1` replaced by `leaves`.
///
/// Returns the nodes standing in for `node` at its own level: none when it
/// was emptied, several when it overflowed.
fn splice(
    node: &Arc<Node>,
    first_line: usize,
    edit: (usize, usize),
    leaves: &mut Option<Vec<Arc<Node>>>,
    capacity: usize,
) -> Vec<Arc<Node>> {
    match section(first_line, node.lines(), edit.0, edit.1) {
        Section::Untouched => return vec![Arc::clone(node)],
        Section::Inside => return Vec::new(),
        Section::Boundary => {}
    }
    match &**node {
        Node::Leaf { .. } if first_line == edit.0 => leaves.take().unwrap_or_default(),
        Node::Leaf { .. } => Vec::new(),
        Node::Branch { children, .. } => {
            let mut rebuilt = Vec::with_capacity(children.len());
            let mut line = first_line;
            for child in children {
                rebuilt.extend(splice(child, line, edit, leaves, capacity));
                line += child.lines();
            }
            group(rebuilt, capacity)
        }
    }
}

/// Iterator over the lines of a [`LineIndex`], terminators included.
pub struct Lines<'a> {
    stack: Vec<std::slice::Iter<'a, Arc<Node>>>,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            let child = self.stack.last_mut()?.next();
            match child.map(|child| &**child) {
                None => {
                    self.stack.pop();
                }
                Some(Node::Leaf { text, .. }) => return Some(&**text),
                Some(Node::Branch { children, .. }) => self.stack.push(children.iter()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Structural checks: cached totals, uniform leaf depth, fan-out bound,
    /// and line terminators on every leaf but the last.
    fn check_invariants(index: &LineIndex) {
        fn walk(node: &Node, depth: usize, capacity: usize, leaf_depths: &mut Vec<usize>) {
            match node {
                Node::Leaf { text, chars } => {
                    assert!(!text.is_empty(), "empty leaf");
                    assert_eq!(*chars, text.chars().count());
                    leaf_depths.push(depth);
                }
                Node::Branch {
                    children,
                    chars,
                    lines,
                } => {
                    assert!(!children.is_empty(), "empty interior node");
                    assert!(children.len() <= capacity, "overfull node");
                    let sum_chars: usize = children.iter().map(|c| c.chars()).sum();
                    let sum_lines: usize = children.iter().map(|c| c.lines()).sum();
                    assert_eq!(*chars, sum_chars);
                    assert_eq!(*lines, sum_lines);
                    for child in children {
                        walk(child, depth + 1, capacity, leaf_depths);
                    }
                }
            }
        }

        if index.is_empty() {
            assert_eq!(index.line_count(), 0);
            return;
        }
        let mut depths = Vec::new();
        for child in index.root.children() {
            walk(child, 1, index.capacity, &mut depths);
        }
        assert!(depths.windows(2).all(|w| w[0] == w[1]), "uneven leaves");
        let lines: Vec<_> = index.lines().collect();
        for line in &lines[..lines.len() - 1] {
            assert!(line.ends_with('\n'), "unterminated inner line {line:?}");
        }
    }

    /// Deterministic pseudo-random sequence for edit fuzzing.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: usize) -> usize {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((self.0 >> 33) as usize) % bound.max(1)
        }
    }

    fn apply(model: &str, pos: usize, del: usize, insert: &str) -> String {
        let chars: Vec<char> = model.chars().collect();
        let mut out: String = chars[..pos].iter().collect();
        out.push_str(insert);
        out.extend(&chars[pos + del..]);
        out
    }

    #[test]
    fn test_load_builds_balanced_tree() {
        let text: String = (0..100).map(|i| format!("line {i}\n")).collect();
        let index = LineIndex::from_text(&text);
        check_invariants(&index);
        assert_eq!(index.line_count(), 100);
        assert_eq!(index.text(), text);
        // 100 leaves at fan-out 4 need four levels.
        assert_eq!(index.depth(), 4);
    }

    #[test]
    fn test_empty_document() {
        let index = LineIndex::from_text("");
        assert!(index.is_empty());
        assert_eq!(index.line_count(), 0);
        assert_eq!(index.get_text(0, 10), "");
        assert_eq!(index.char_offset_to_line_and_pos(0), Position::new(0, 0));
        assert_eq!(index.line_number_to_info(0), LineInfo { offset: 0, text: "" });
    }

    #[rstest]
    #[case::zero_length(2, 0, "")]
    #[case::start_past_end(50, 3, "")]
    #[case::clamped_end(9, 100, "\nccc")]
    #[case::across_lines(2, 5, "a\nbbb")]
    #[case::whole(0, 13, "aaa\nbbbbb\nccc")]
    fn test_get_text_ranges(#[case] start: usize, #[case] len: usize, #[case] expected: &str) {
        let index = LineIndex::from_text("aaa\nbbbbb\nccc");
        assert_eq!(index.get_text(start, len), expected);
    }

    #[test]
    fn test_line_info_past_last_line_is_document_end() {
        let index = LineIndex::from_text("ab\ncd\n");
        assert_eq!(index.line_number_to_info(1), LineInfo { offset: 3, text: "cd\n" });
        assert_eq!(index.line_number_to_info(2), LineInfo { offset: 6, text: "" });
        assert_eq!(index.line_number_to_info(40).offset, 6);
        assert_eq!(index.line_text(2), None);
    }

    #[test]
    fn test_document_end_after_newline_is_next_line() {
        let index = LineIndex::from_text("ab\ncd\n");
        assert_eq!(index.char_offset_to_line_and_pos(6), Position::new(2, 0));
        let index = LineIndex::from_text("ab\ncd");
        assert_eq!(index.char_offset_to_line_and_pos(5), Position::new(1, 2));
    }

    #[test]
    fn test_offsets_and_positions_are_inverse() {
        let text = "héllo\n\nwörld 日本\nlast";
        let index = LineIndex::with_capacity(text, 2);
        for offset in 0..=index.len() {
            let position = index.char_offset_to_line_and_pos(offset);
            assert_eq!(index.position_to_offset(position), offset, "at {position}");
        }
    }

    #[test]
    fn test_position_column_clamps_to_line_content() {
        let index = LineIndex::from_text("abc\ndef");
        assert_eq!(index.position_to_offset(Position::new(0, 99)), 3);
        assert_eq!(index.position_to_offset(Position::new(1, 99)), 7);
        assert_eq!(index.position_to_offset(Position::new(9, 0)), 7);
    }

    #[test]
    fn test_insert_at_end_of_document() {
        let index = LineIndex::from_text("hello");
        let edited = index.edit(5, 0, " world");
        assert_eq!(edited.text(), "hello world");
        assert_eq!(edited.line_count(), 1);

        let index = LineIndex::from_text("a\n");
        let edited = index.edit(2, 0, "b");
        assert_eq!(edited.text(), "a\nb");
        assert_eq!(edited.line_count(), 2);
    }

    #[test]
    fn test_delete_ending_on_line_boundary_joins_following_line() {
        let index = LineIndex::from_text("one\ntwo\nthree\n");
        // Delete "two\n": the range ends exactly where "three" starts.
        let edited = index.edit(4, 4, "");
        assert_eq!(edited.text(), "one\nthree\n");
        assert_eq!(edited.line_count(), 2);
        check_invariants(&edited);

        // Delete just the newline between lines.
        let edited = index.edit(3, 1, "");
        assert_eq!(edited.text(), "onetwo\nthree\n");
        assert_eq!(edited.line_count(), 2);
    }

    #[test]
    fn test_deleting_everything_leaves_empty_index() {
        let index = LineIndex::from_text("a\nb\nc");
        let edited = index.edit(0, 5, "");
        assert!(edited.is_empty());
        assert_eq!(edited.line_count(), 0);
        assert_eq!(edited.edit(0, 0, "x\ny").text(), "x\ny");
    }

    #[test]
    fn test_edit_clamps_out_of_range_arguments() {
        let index = LineIndex::from_text("abc");
        assert_eq!(index.edit(10, 5, "!").text(), "abc!");
        assert_eq!(index.edit(1, 50, "").text(), "a");
    }

    #[test]
    fn test_edit_leaves_original_untouched_and_shares_subtrees() {
        let text: String = (0..64).map(|i| format!("{i}\n")).collect();
        let index = LineIndex::from_text(&text);
        let edited = index.edit(index.len() - 1, 0, "x");

        assert_eq!(index.text(), text);
        assert!(edited.text().ends_with("63x\n"));
        assert!(Arc::ptr_eq(
            &index.root.children()[0],
            &edited.root.children()[0]
        ));
    }

    #[test]
    fn test_large_insert_splits_and_grows_root() {
        let index = LineIndex::from_text("start\nend\n");
        let block: String = (0..200).map(|i| format!("{i}\n")).collect();
        let edited = index.edit(6, 0, &block);
        check_invariants(&edited);
        assert_eq!(edited.line_count(), 202);
        assert_eq!(edited.line_text(1), Some("0\n"));
        assert_eq!(edited.line_text(201), Some("end\n"));
        assert!(edited.depth() > index.depth());
    }

    #[rstest]
    #[case::fan_out_two(2, 7)]
    #[case::fan_out_four(4, 11)]
    #[case::fan_out_eight(8, 23)]
    fn test_random_edits_match_plain_string(#[case] capacity: usize, #[case] seed: u64) {
        let alphabet = ['a', 'b', '\n', 'é', ' ', '\n'];
        let mut rng = Lcg(seed);
        let mut model = String::from("fn main() {\n    body\n}\n");
        let mut index = LineIndex::with_capacity(&model, capacity);

        for _ in 0..400 {
            let len = model.chars().count();
            let pos = rng.next(len + 1);
            let del = rng.next((len - pos).min(12) + 1);
            let insert: String = (0..rng.next(10))
                .map(|_| alphabet[rng.next(alphabet.len())])
                .collect();

            let previous = index.clone();
            let previous_text = model.clone();
            index = index.edit(pos, del, &insert);
            model = apply(&model, pos, del, &insert);

            check_invariants(&index);
            assert_eq!(index.text(), model);
            assert_eq!(index.len(), model.chars().count());
            assert_eq!(previous.text(), previous_text);
        }
    }
}
