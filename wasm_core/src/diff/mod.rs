//! Text comparison: a line-level diff with word-level highlights inside
//! changed line pairs, plus a git-style unified rendering of the result.
pub mod lcs;
pub mod session;
pub mod tokenize;

use log::debug;
use serde::{Deserialize, Serialize};

use lcs::{align, DiffOp};
pub use session::{DiffSession, Generation};
pub use tokenize::{normalize_key, tokenize, NormalizationSettings, Token};

/// Type of change for a line or a highlighted span
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present in both texts
    Unchanged,
    /// Only in the new text
    Added,
    /// Only in the old text
    Removed,
}

/// A highlighted piece of a line
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: ChangeKind,
    pub text: String,
}

/// Represents a single line in the diff output
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedLine {
    pub kind: ChangeKind,
    /// The full line without its terminator
    pub text: String,
    /// Word-level highlights, only for lines paired inside a changed block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spans: Option<Vec<Span>>,
    /// Line number in the old text (1-indexed), None for additions
    pub old_line: Option<usize>,
    /// Line number in the new text (1-indexed), None for removals
    pub new_line: Option<usize>,
}

/// Statistics about the diff
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
    pub unchanged: usize,
}

impl DiffStats {
    pub fn from_lines(lines: &[AnnotatedLine]) -> Self {
        lines.iter().fold(Self::default(), |mut stats, line| {
            match line.kind {
                ChangeKind::Unchanged => stats.unchanged += 1,
                ChangeKind::Added => stats.additions += 1,
                ChangeKind::Removed => stats.deletions += 1,
            }
            stats
        })
    }
}

/// Result of a text diff operation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiffResult {
    pub lines: Vec<AnnotatedLine>,
    pub stats: DiffStats,
}

impl DiffResult {
    pub fn new(lines: Vec<AnnotatedLine>) -> Self {
        let stats = DiffStats::from_lines(&lines);
        Self { lines, stats }
    }
}

/// Configuration for unified rendering
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Number of context lines around changes (default: 3)
    pub context_lines: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { context_lines: 3 }
    }
}

/// Splits on `\n` and `\r\n`. Empty text has no lines at all.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

fn keyed_lines<'a>(text: &'a str, settings: &NormalizationSettings) -> Vec<Token<'a>> {
    split_lines(text)
        .into_iter()
        .map(|render| Token {
            render,
            key: normalize_key(render, settings),
        })
        .collect()
}

/// Word-diffs one old/new line pair into a span list for each side.
fn word_spans(
    old_line: &str,
    new_line: &str,
    settings: &NormalizationSettings,
) -> (Vec<Span>, Vec<Span>) {
    let old_tokens = tokenize(old_line, settings);
    let new_tokens = tokenize(new_line, settings);
    let mut old_spans = Vec::with_capacity(old_tokens.len());
    let mut new_spans = Vec::with_capacity(new_tokens.len());
    for op in align(&old_tokens, &new_tokens) {
        match op {
            DiffOp::Unchanged { old, new } => {
                old_spans.push(Span {
                    kind: ChangeKind::Unchanged,
                    text: old.render.to_string(),
                });
                new_spans.push(Span {
                    kind: ChangeKind::Unchanged,
                    text: new.render.to_string(),
                });
            }
            DiffOp::Removed(old) => old_spans.push(Span {
                kind: ChangeKind::Removed,
                text: old.render.to_string(),
            }),
            DiffOp::Added(new) => new_spans.push(Span {
                kind: ChangeKind::Added,
                text: new.render.to_string(),
            }),
        }
    }
    (old_spans, new_spans)
}

/// Compares two texts line by line, then word by word inside changed blocks.
///
/// A run of removed lines directly followed by a run of added lines is a
/// changed block. Its lines are paired by position and each pair gets
/// word-level spans; lines beyond the shorter run stay unpaired. Removed
/// lines of a block are emitted before its added lines.
pub fn compute_diff(
    old_text: &str,
    new_text: &str,
    settings: &NormalizationSettings,
) -> Vec<AnnotatedLine> {
    let old_lines = keyed_lines(old_text, settings);
    let new_lines = keyed_lines(new_text, settings);
    debug!(
        "diffing {} old lines against {} new lines",
        old_lines.len(),
        new_lines.len()
    );
    let script = align(&old_lines, &new_lines);

    let mut out = Vec::with_capacity(script.len());
    let mut old_no = 0;
    let mut new_no = 0;
    let mut idx = 0;
    while idx < script.len() {
        if let DiffOp::Unchanged { new, .. } = script[idx] {
            old_no += 1;
            new_no += 1;
            out.push(AnnotatedLine {
                kind: ChangeKind::Unchanged,
                text: new.render.to_string(),
                spans: None,
                old_line: Some(old_no),
                new_line: Some(new_no),
            });
            idx += 1;
            continue;
        }

        let mut removed = Vec::new();
        while let Some(DiffOp::Removed(line)) = script.get(idx) {
            removed.push(line.render);
            idx += 1;
        }
        let mut added = Vec::new();
        while let Some(DiffOp::Added(line)) = script.get(idx) {
            added.push(line.render);
            idx += 1;
        }

        let paired = removed.len().min(added.len());
        let mut old_spans = Vec::with_capacity(paired);
        let mut new_spans = Vec::with_capacity(paired);
        for (old_line, new_line) in removed.iter().zip(added.iter()) {
            let (o, n) = word_spans(old_line, new_line, settings);
            old_spans.push(o);
            new_spans.push(n);
        }

        let mut old_spans = old_spans.into_iter();
        for text in removed {
            old_no += 1;
            out.push(AnnotatedLine {
                kind: ChangeKind::Removed,
                text: text.to_string(),
                spans: old_spans.next(),
                old_line: Some(old_no),
                new_line: None,
            });
        }
        let mut new_spans = new_spans.into_iter();
        for text in added {
            new_no += 1;
            out.push(AnnotatedLine {
                kind: ChangeKind::Added,
                text: text.to_string(),
                spans: new_spans.next(),
                old_line: None,
                new_line: Some(new_no),
            });
        }
    }
    out
}

/// Render an annotated diff as a unified patch (similar to git diff)
///
/// Returns an empty string when no line changed.
pub fn render_unified(
    lines: &[AnnotatedLine],
    old_name: &str,
    new_name: &str,
    config: &DiffConfig,
) -> String {
    let changed: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.kind != ChangeKind::Unchanged)
        .map(|(i, _)| i)
        .collect();
    if changed.is_empty() {
        return String::new();
    }

    // Group changes whose context windows touch into a single hunk.
    let context = config.context_lines;
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for &i in &changed {
        let start = i.saturating_sub(context);
        let end = (i + 1 + context).min(lines.len());
        match hunks.last_mut() {
            Some((_, last_end)) if start <= *last_end => *last_end = end,
            _ => hunks.push((start, end)),
        }
    }

    // Old/new lines preceding each index, for hunk headers.
    let mut old_before = Vec::with_capacity(lines.len());
    let mut new_before = Vec::with_capacity(lines.len());
    let (mut old_seen, mut new_seen) = (0, 0);
    for line in lines {
        old_before.push(old_seen);
        new_before.push(new_seen);
        if line.kind != ChangeKind::Added {
            old_seen += 1;
        }
        if line.kind != ChangeKind::Removed {
            new_seen += 1;
        }
    }

    let mut output = String::new();
    output.push_str(&format!("--- {}\n", old_name));
    output.push_str(&format!("+++ {}\n", new_name));

    for (start, end) in hunks {
        let hunk_lines = &lines[start..end];
        let old_count = hunk_lines
            .iter()
            .filter(|line| line.kind != ChangeKind::Added)
            .count();
        let new_count = hunk_lines
            .iter()
            .filter(|line| line.kind != ChangeKind::Removed)
            .count();
        let old_start = old_before[start] + usize::from(old_count > 0);
        let new_start = new_before[start] + usize::from(new_count > 0);

        output.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start, old_count, new_start, new_count
        ));

        for line in hunk_lines {
            match line.kind {
                ChangeKind::Unchanged => output.push(' '),
                ChangeKind::Added => output.push('+'),
                ChangeKind::Removed => output.push('-'),
            }
            output.push_str(&line.text);
            output.push('\n');
        }
    }

    output
}
