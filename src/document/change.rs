use crate::text::{char_len, char_to_byte};

/// One edit in char offsets: `delete_len` chars at `start` were replaced by
/// `inserted`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChange {
    pub start: usize,
    pub delete_len: usize,
    pub inserted: String,
}

impl TextChange {
    pub fn new(start: usize, delete_len: usize, inserted: impl Into<String>) -> Self {
        Self {
            start,
            delete_len,
            inserted: inserted.into(),
        }
    }

    pub fn inserted_len(&self) -> usize {
        char_len(&self.inserted)
    }

    /// Apply the change to `text`, clamping to its bounds.
    pub fn apply(&self, text: &str) -> String {
        let start = char_to_byte(text, self.start);
        let end = start + char_to_byte(&text[start..], self.delete_len);
        let mut out = String::with_capacity(text.len() + self.inserted.len());
        out.push_str(&text[..start]);
        out.push_str(&self.inserted);
        out.push_str(&text[end..]);
        out
    }
}

/// Replay `changes` in order on `text`.
pub fn apply_changes(text: &str, changes: &[TextChange]) -> String {
    changes
        .iter()
        .fold(text.to_string(), |text, change| change.apply(&text))
}

/// A single span covering a run of changes: `span_len` chars at
/// `span_start` in the old text became `new_len` chars.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextChangeRange {
    pub span_start: usize,
    pub span_len: usize,
    pub new_len: usize,
}

impl TextChangeRange {
    /// Collapse consecutive changes into the smallest covering span.
    pub fn collapse(changes: &[TextChange]) -> Option<TextChangeRange> {
        let (first, rest) = changes.split_first()?;
        let mut old_start = first.start as i64;
        let mut old_end = (first.start + first.delete_len) as i64;
        let mut new_end = (first.start + first.inserted_len()) as i64;

        for change in rest {
            let start = change.start as i64;
            let end = (change.start + change.delete_len) as i64;
            let next_new_end = (change.start + change.inserted_len()) as i64;

            // Positions of the later change are in the coordinates produced
            // by the earlier ones; map its end back through the accumulated
            // delta and widen both sides.
            let merged_old_end = old_end.max(old_end + (end - new_end));
            let merged_new_end = next_new_end.max(next_new_end + (new_end - end));
            old_start = old_start.min(start);
            old_end = merged_old_end;
            new_end = merged_new_end;
        }

        Some(TextChangeRange {
            span_start: old_start as usize,
            span_len: (old_end - old_start) as usize,
            new_len: (new_end - old_start) as usize,
        })
    }
}

/// Answer to "what changed between two versions".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeRange {
    Unchanged,
    /// Changes to replay, in order, on the older version's text.
    Changes(Vec<TextChange>),
    /// The older version has been evicted, or the versions cannot be
    /// compared.
    Unavailable,
}

impl ChangeRange {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ChangeRange::Unavailable)
    }

    pub fn collapsed(&self) -> Option<TextChangeRange> {
        match self {
            ChangeRange::Unchanged => Some(TextChangeRange {
                span_start: 0,
                span_len: 0,
                new_len: 0,
            }),
            ChangeRange::Changes(changes) => TextChangeRange::collapse(changes),
            ChangeRange::Unavailable => None,
        }
    }
}
