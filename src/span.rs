//! Offset-based editing of document text.
//!
//! [`EditBuffer`] owns the text under edit together with a set of tracked
//! [`Span`]s. Every splice re-bases the tracked spans, so a caller can
//! record element boundaries once, edit the text in any order, and still
//! read correct positions afterwards. Untouched regions of the text are
//! preserved byte for byte.

/// Half-open byte range `[start, end)` into the buffer text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} after end {}", start, end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `true` when `pos` lies strictly between the span boundaries.
    pub fn strictly_contains(&self, pos: usize) -> bool {
        self.start < pos && pos < self.end
    }
}

/// Handle to a span tracked by an [`EditBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(usize);

#[derive(Debug, Clone)]
pub struct EditBuffer {
    text: String,
    tracked: Vec<Span>,
}

impl EditBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tracked: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Start offsets of every occurrence of `needle`, in text order.
    pub fn find_all(&self, needle: &str) -> Vec<usize> {
        self.text.match_indices(needle).map(|(pos, _)| pos).collect()
    }

    /// Position of the last `<` strictly before `pos`.
    pub fn tag_start_before(&self, pos: usize) -> Option<usize> {
        self.text[..pos].rfind('<')
    }

    /// Position just past the first `>` at or after `pos`.
    pub fn tag_end_after(&self, pos: usize) -> Option<usize> {
        self.text[pos..].find('>').map(|rel| pos + rel + 1)
    }

    /// Start tracking `span`; its boundaries follow every later edit.
    pub fn track(&mut self, span: Span) -> SpanId {
        assert!(span.end <= self.text.len(), "span {:?} past end of text", span);
        self.tracked.push(span);
        SpanId(self.tracked.len() - 1)
    }

    /// Current boundaries of a tracked span.
    pub fn span(&self, id: SpanId) -> Span {
        self.tracked[id.0]
    }

    /// Replace `range` with `replacement` and re-base every tracked span.
    ///
    /// A tracked span equal to `range` afterwards covers exactly the
    /// replacement. A tracked span inside a deleted range collapses to an
    /// empty span at the deletion point.
    pub fn replace(&mut self, range: Span, replacement: &str) {
        assert!(
            range.end <= self.text.len(),
            "edit {:?} past end of text",
            range
        );
        self.text.replace_range(range.start..range.end, replacement);
        let inserted = replacement.len();
        for span in &mut self.tracked {
            let start = rebase_start(span.start, range, inserted);
            let end = rebase_end(span.end, range, inserted).max(start);
            *span = Span { start, end };
        }
    }

    pub fn delete(&mut self, range: Span) {
        self.replace(range, "");
    }
}

fn rebase_start(pos: usize, edit: Span, inserted: usize) -> usize {
    if pos < edit.start {
        pos
    } else if pos >= edit.end {
        pos - edit.len() + inserted
    } else {
        edit.start
    }
}

fn rebase_end(pos: usize, edit: Span, inserted: usize) -> usize {
    if pos <= edit.start {
        pos
    } else if pos >= edit.end {
        pos - edit.len() + inserted
    } else {
        edit.start + inserted
    }
}
