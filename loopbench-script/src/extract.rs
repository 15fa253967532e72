//! Source Extractor
//!
//! Turns a callable's source (signature line plus body) into the flat list of
//! executable body statements, each with a normalised nesting level.
//!
//! - blank lines, the leading docstring and ordinary comments are dropped
//! - comment lines carrying a region marker are kept for the tagger
//! - the first kept line fixes the indentation unit; every other line must
//!   sit at an exact multiple of it
//! - statements directly under the signature are level 0

use crate::callable::Callable;
use crate::tagger::parse_marker;
use loopbench_core::{BenchError, Result};

/// One kept body line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Nesting depth, 0 for statements directly under the signature
    pub level: usize,
    /// Statement text without indentation or trailing comment
    pub text: String,
    /// 1-based line number in the module
    pub line: usize,
}

impl SourceLine {
    /// Whether this line is a region marker comment.
    pub fn is_marker(&self) -> bool {
        self.text.starts_with('#')
    }
}

/// Extract the executable body of `callable`.
pub fn extract(callable: &Callable) -> Result<Vec<SourceLine>> {
    extract_lines(callable.name(), callable.source(), callable.first_line())
}

/// Extract the body from raw `lines`, where `lines[0]` is the signature and
/// sits on line `first_line` of its module.
pub fn extract_lines<S: AsRef<str>>(
    function: &str,
    lines: &[S],
    first_line: usize,
) -> Result<Vec<SourceLine>> {
    let Some(signature) = lines.first() else {
        return Err(BenchError::EmptyBody {
            function: function.to_string(),
        });
    };
    let signature_indent = indent_of(signature.as_ref());

    let mut body = Vec::new();
    let mut unit: Option<usize> = None;
    let mut first_statement = true;
    let mut i = 1;

    while i < lines.len() {
        let raw = lines[i].as_ref();
        let line = first_line + i;
        let trimmed = raw.trim();
        i += 1;

        if trimmed.is_empty() {
            continue;
        }
        let is_comment = trimmed.starts_with('#');
        if is_comment && parse_marker(trimmed).is_none() {
            continue;
        }
        if first_statement && is_docstring_start(trimmed) {
            i = docstring_end(lines, i - 1);
            first_statement = false;
            continue;
        }
        first_statement = false;

        let text = if is_comment {
            trimmed
        } else {
            strip_comment(trimmed)
        };

        let indent = indent_of(raw);
        let relative = indent.saturating_sub(signature_indent);
        let unit = *unit.get_or_insert(relative);
        if unit == 0 || relative == 0 || relative % unit != 0 {
            return Err(BenchError::MalformedIndentation {
                function: function.to_string(),
                line,
                indent: relative,
                unit,
                text: text.to_string(),
            });
        }

        let level = relative / unit - 1;
        if level == 0 && is_return(text) {
            return Err(BenchError::ReturnInMeasuredBody {
                function: function.to_string(),
                line,
                text: text.to_string(),
            });
        }

        body.push(SourceLine {
            level,
            text: text.to_string(),
            line,
        });
    }

    if body.iter().all(SourceLine::is_marker) {
        return Err(BenchError::EmptyBody {
            function: function.to_string(),
        });
    }
    Ok(body)
}

/// Width of a line's leading whitespace; tabs advance to the next multiple of 8.
pub(crate) fn indent_of(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            _ => break,
        }
    }
    width
}

/// Drop a trailing `#` comment that is not inside a string literal.
pub(crate) fn strip_comment(text: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '#' => return text[..i].trim_end(),
                _ => {}
            },
        }
    }
    text
}

pub(crate) fn is_docstring_start(trimmed: &str) -> bool {
    trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''")
}

/// Index of the first line after the docstring opening at `start`.
pub(crate) fn docstring_end<S: AsRef<str>>(lines: &[S], start: usize) -> usize {
    let opening = lines[start].as_ref().trim();
    let delimiter = &opening[..3];
    if opening[3..].contains(delimiter) {
        return start + 1;
    }
    lines[start + 1..]
        .iter()
        .position(|l| l.as_ref().contains(delimiter))
        .map_or(lines.len(), |offset| start + offset + 2)
}

fn is_return(text: &str) -> bool {
    text == "return" || text.starts_with("return ") || text.starts_with("return(")
}
