//
//  segment.rs
//  RouteLinter
//

//! Splitting flattened path pieces into [`Segment`]s.

use super::{Dialect, Piece};
use crate::model::Segment;

/// One slash-delimited chunk before classification.
#[derive(Debug, Default)]
struct RawSegment {
    text: String,
    /// Name of the first embedded expression, if any.
    param: Option<String>,
}

impl RawSegment {
    fn is_empty(&self) -> bool {
        self.param.is_none() && self.text.trim().is_empty()
    }
}

/// Split pieces on `/` and classify each chunk.
///
/// In the route dialect a `/` inside a `(...)` constraint doesn't split.
pub(super) fn split_segments(pieces: &[Piece], dialect: Dialect) -> Vec<Segment> {
    let mut raw: Vec<RawSegment> = Vec::new();
    let mut current = RawSegment::default();
    let mut depth = 0usize;

    for piece in pieces {
        match piece {
            Piece::Text(text) => {
                for c in text.chars() {
                    match c {
                        '(' if dialect == Dialect::Route => {
                            depth += 1;
                            current.text.push(c);
                        }
                        ')' if dialect == Dialect::Route => {
                            depth = depth.saturating_sub(1);
                            current.text.push(c);
                        }
                        '/' if depth == 0 => {
                            raw.push(std::mem::take(&mut current));
                        }
                        _ => current.text.push(c),
                    }
                }
            }
            Piece::Param(name) => {
                if current.param.is_none() {
                    current.param = Some(name.clone());
                }
            }
        }
    }
    raw.push(current);

    let raw: Vec<RawSegment> = raw.into_iter().filter(|s| !s.is_empty()).collect();
    let last = raw.len().saturating_sub(1);
    raw.into_iter()
        .enumerate()
        .map(|(i, seg)| match seg.param {
            // An embedded expression anywhere in the chunk makes it runtime.
            Some(name) => Segment::param(name),
            None => classify_text(seg.text.trim(), dialect, i == last),
        })
        .collect()
}

/// Classify a purely literal chunk: `:id`, `:id?`, `:id(\d+)`, `*`, or text.
pub(super) fn classify_text(text: &str, dialect: Dialect, is_last: bool) -> Segment {
    if text == "*" {
        return if is_last {
            Segment::Wildcard
        } else {
            Segment::literal(text)
        };
    }

    let Some(rest) = text.strip_prefix(':') else {
        return Segment::literal(text);
    };
    let name_len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if name_len == 0 {
        return Segment::literal(text);
    }
    let (name, suffix) = rest.split_at(name_len);

    match suffix {
        "" => Segment::param(name),
        "?" if dialect == Dialect::Route => Segment::optional(name),
        "*" if is_last => Segment::Wildcard,
        _ if suffix.starts_with('(') => {
            let (body, optional) = match suffix.strip_suffix('?') {
                Some(body) if dialect == Dialect::Route => (body, true),
                _ => (suffix, false),
            };
            match body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
                Some(_) if optional => Segment::optional(name),
                Some(constraint) => Segment::pattern(name, constraint),
                None => Segment::literal(text),
            }
        }
        _ => Segment::literal(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Piece {
        Piece::Text(s.to_string())
    }

    #[test]
    fn test_classify_param_forms() {
        assert_eq!(classify_text(":id", Dialect::Route, false), Segment::param("id"));
        assert_eq!(
            classify_text(":filename?", Dialect::Route, true),
            Segment::optional("filename")
        );
        assert_eq!(
            classify_text(r":userId(\d+)", Dialect::Route, true),
            Segment::pattern("userId", r"\d+")
        );
        assert_eq!(classify_text(":path*", Dialect::Route, true), Segment::Wildcard);
        assert_eq!(classify_text("*", Dialect::Route, true), Segment::Wildcard);
        assert_eq!(classify_text("*", Dialect::Route, false), Segment::literal("*"));
        assert_eq!(classify_text(":", Dialect::Route, true), Segment::literal(":"));
        assert_eq!(classify_text("users", Dialect::Call, true), Segment::literal("users"));
    }

    #[test]
    fn test_split_keeps_slash_inside_constraint() {
        let segments = split_segments(&[text("/docs/:rest(a/b)")], Dialect::Route);
        assert_eq!(
            segments,
            vec![Segment::literal("docs"), Segment::pattern("rest", "a/b")]
        );
    }

    #[test]
    fn test_split_mixed_chunk_becomes_param() {
        let pieces = vec![
            text("/api/report-"),
            Piece::Param("year".to_string()),
            text(".csv"),
        ];
        assert_eq!(
            split_segments(&pieces, Dialect::Call),
            vec![Segment::literal("api"), Segment::param("year")]
        );
    }

    #[test]
    fn test_split_drops_empty_chunks() {
        let segments = split_segments(&[text("  //api//users/ ")], Dialect::Call);
        assert_eq!(
            segments,
            vec![Segment::literal("api"), Segment::literal("users")]
        );
    }
}
