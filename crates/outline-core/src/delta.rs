//! Structured buffer change deltas.
//!
//! Every coalesced [`StorageChange`](crate::text_storage::StorageChange) carries the exact
//! splices applied to the buffer so incremental consumers (layout caches, accessibility,
//! search highlighting) can follow along without diffing old and new text.
//!
//! Offsets are counted in characters (Unicode scalar values).

/// One paragraph-buffer splice, in character offsets.
///
/// `start` refers to the buffer as left by the previous splice of the same delta, so the
/// splices of a [`TextDelta`] only make sense replayed front to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDeltaEdit {
    /// Where the splice starts.
    pub start: usize,
    /// Characters removed, terminators included.
    pub deleted_text: String,
    /// Characters inserted, terminators included.
    pub inserted_text: String,
}

impl TextDeltaEdit {
    /// Removed character count.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Inserted character count.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// End of the replaced range, before the splice.
    pub fn end(&self) -> usize {
        self.start + self.deleted_len()
    }

    /// Paragraph terminators added minus those removed.
    pub fn paragraph_delta(&self) -> isize {
        let count = |text: &str| text.matches('\n').count() as isize;
        count(&self.inserted_text) - count(&self.deleted_text)
    }
}

/// All splices of one edit bracket.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextDelta {
    /// Buffer length when the bracket opened.
    pub before_char_count: usize,
    /// Buffer length when the bracket closed.
    pub after_char_count: usize,
    /// Splices in the order they were applied.
    pub edits: Vec<TextDeltaEdit>,
}

impl TextDelta {
    /// `true` if the bracket spliced nothing.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Net number of paragraphs added by the bracket.
    pub fn paragraph_delta(&self) -> isize {
        self.edits.iter().map(TextDeltaEdit::paragraph_delta).sum()
    }

    /// Replay the splices over `text`.
    pub fn apply(&self, text: &str) -> String {
        let mut chars: Vec<char> = text.chars().collect();
        for edit in &self.edits {
            let start = edit.start.min(chars.len());
            let end = edit.end().min(chars.len());
            chars.splice(start..end, edit.inserted_text.chars());
        }
        chars.into_iter().collect()
    }
}
