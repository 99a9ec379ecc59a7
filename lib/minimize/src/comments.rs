//! Deciding which comments survive a minification pass.
//!
//! Third-party license blocks tend to be repeated once per bundled module. The [`CommentFilter`]
//! keeps the first copy of each license comment and drops every later one, including copies that
//! only differ in their indentation.
use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

/// Comments of the shape `/*! ... */`, or mentioning a license or conditional compilation.
static PRESERVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^!|@preserve|@license|@cc_on|\blicensed\b").expect("valid preserve pattern")
});

/// A newline followed by any run of whitespace, including further newlines.
static BLANKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s+").expect("valid blank pattern"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentKind {
    /// A `// ...` comment.
    Line,
    /// A `/* ... */` comment, possibly spanning several lines.
    Block,
}

/// One comment seen by the minifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentToken {
    pub kind: CommentKind,
    /// The comment body without its delimiters, i.e. `! MIT` for `/*! MIT */`.
    pub text: String,
    /// Whether the comment started on a fresh line in the source.
    pub leading_newline: bool,
}

impl CommentToken {
    pub fn block(text: impl Into<String>) -> Self {
        CommentToken {
            kind: CommentKind::Block,
            text: text.into(),
            leading_newline: true,
        }
    }

    pub fn line(text: impl Into<String>) -> Self {
        CommentToken {
            kind: CommentKind::Line,
            text: text.into(),
            leading_newline: true,
        }
    }

    /// The comment as it is written in source, delimiters included.
    pub fn to_source(&self) -> String {
        match self.kind {
            CommentKind::Line => format!("//{}", self.text),
            CommentKind::Block => format!("/*{}*/", self.text),
        }
    }
}

/// Exact comment texts already emitted during one minify invocation.
#[derive(Default, Debug)]
pub struct DedupCache {
    seen: HashSet<String>,
}

impl DedupCache {
    pub fn contains(&self, text: &str) -> bool {
        self.seen.contains(text)
    }

    /// Record `text`, returns `false` if it had already been seen.
    pub fn insert(&mut self, text: &str) -> bool {
        if self.seen.contains(text) {
            return false;
        }

        self.seen.insert(text.to_owned())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Whether the comment is a block comment that asks to be preserved.
pub fn is_preservation_candidate(token: &CommentToken) -> bool {
    token.kind == CommentKind::Block && PRESERVE.is_match(&token.text)
}

/// Collapse each newline and the whitespace that follows it into a newline and a single space.
///
/// Applying this twice yields the same text as applying it once.
pub fn normalize_whitespace(text: &str) -> String {
    BLANKS.replace_all(text, "\n ").into_owned()
}

/// The de-duplicating comment decision.
///
/// Create one filter per minify invocation: the cache it owns must not leak into other chunks or
/// builds.
#[derive(Default, Debug)]
pub struct CommentFilter {
    cache: DedupCache,
}

impl CommentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `token` is kept, rewriting it to its normalized form when it is.
    pub fn keep(&mut self, token: &mut CommentToken) -> bool {
        if !is_preservation_candidate(token) {
            return false;
        }

        if !self.cache.insert(&token.text) {
            tracing::trace!(comment = %token.text, "dropping repeated comment");
            return false;
        }

        // An already normalized comment is covered by the verbatim entry.
        let normalized = normalize_whitespace(&token.text);
        if normalized != token.text && !self.cache.insert(&normalized) {
            tracing::trace!(comment = %normalized, "dropping repeated normalized comment");
            return false;
        }

        if !normalized.contains('\n') {
            token.leading_newline = false;
        }

        token.text = normalized;
        true
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }
}
