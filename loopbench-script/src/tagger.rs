//! Region Tagger
//!
//! Replaces region marker comments with timing probes and validates that the
//! markers balance. A body without markers becomes one implicit region
//! spanning every statement.
//!
//! ```text
//! # @region sort          ->  Start
//! xs = sorted(xs)             xs = sorted(xs)
//! # @endregion            ->  Accumulate { region: "sort" }
//!                             Guard { region: "sort" }      (too-fast check only)
//! ```

use crate::extract::SourceLine;
use loopbench_core::{BenchError, Result, WHOLE_BODY};

/// Token opening a measured region
pub const START_TOKEN: &str = "@region";
/// Token closing a measured region
pub const END_TOKEN: &str = "@endregion";

/// A region marker comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Opens a region, optionally labelled
    Start(Option<String>),
    /// Closes the open region
    End,
}

/// Parse a comment line as a region marker.
pub fn parse_marker(line: &str) -> Option<Marker> {
    let comment = line.trim().strip_prefix('#')?.trim_start();
    if let Some(rest) = comment.strip_prefix(END_TOKEN) {
        return token_boundary(rest).then_some(Marker::End);
    }
    let rest = comment.strip_prefix(START_TOKEN)?;
    if !token_boundary(rest) {
        return None;
    }
    let label = rest.trim();
    Some(Marker::Start((!label.is_empty()).then(|| label.to_string())))
}

fn token_boundary(rest: &str) -> bool {
    rest.chars().next().is_none_or(char::is_whitespace)
}

/// A timing probe inserted into the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Record the start of a region
    Start,
    /// Add the time since the last start to the iteration's elapsed time
    Accumulate {
        /// Label of the region being closed
        region: String,
    },
    /// Fail if the region just closed ran below the measurability floor
    Guard {
        /// Label of the region being checked
        region: String,
    },
}

/// A body line after tagging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaggedLine {
    /// An ordinary statement
    Code(SourceLine),
    /// A probe at the given nesting level
    Probe {
        /// Nesting level of the probe
        level: usize,
        /// The probe
        probe: Probe,
        /// Source line of the marker, or of the statement it was synthesized next to
        line: usize,
    },
}

impl TaggedLine {
    /// Nesting level of the line
    pub fn level(&self) -> usize {
        match self {
            TaggedLine::Code(code) => code.level,
            TaggedLine::Probe { level, .. } => *level,
        }
    }

    /// 1-based source line
    pub fn line(&self) -> usize {
        match self {
            TaggedLine::Code(code) => code.line,
            TaggedLine::Probe { line, .. } => *line,
        }
    }
}

/// Label used for a region that holds no statements
const EMPTY_REGION: &str = "<empty region>";

struct OpenRegion {
    label: Option<String>,
}

/// Insert timing probes into an extracted body.
pub fn tag(function: &str, body: Vec<SourceLine>, check_too_fast: bool) -> Result<Vec<TaggedLine>> {
    let has_markers = body.iter().any(|l| parse_marker(&l.text).is_some());
    if !has_markers {
        return Ok(tag_implicit(body, check_too_fast));
    }

    let mut out = Vec::with_capacity(body.len() + 4);
    let mut open: Option<OpenRegion> = None;
    let mut last_line = 0;

    for line in body {
        last_line = line.line;
        match parse_marker(&line.text) {
            Some(Marker::Start(label)) => {
                if open.is_some() {
                    return Err(unbalanced(function, &line, "END"));
                }
                open = Some(OpenRegion { label });
                out.push(TaggedLine::Probe {
                    level: line.level,
                    probe: Probe::Start,
                    line: line.line,
                });
            }
            Some(Marker::End) => {
                let Some(region) = open.take() else {
                    return Err(unbalanced(function, &line, "START"));
                };
                close(&mut out, region, line.level, line.line, check_too_fast);
            }
            None => {
                if let Some(region) = open.as_mut() {
                    region.label.get_or_insert_with(|| line.text.clone());
                }
                out.push(TaggedLine::Code(line));
            }
        }
    }

    // A body may end inside its last region
    if let Some(region) = open.take() {
        close(&mut out, region, 0, last_line, check_too_fast);
    }
    Ok(out)
}

fn tag_implicit(body: Vec<SourceLine>, check_too_fast: bool) -> Vec<TaggedLine> {
    let first_line = body.first().map_or(0, |l| l.line);
    let last_line = body.last().map_or(0, |l| l.line);

    let mut out = Vec::with_capacity(body.len() + 3);
    out.push(TaggedLine::Probe {
        level: 0,
        probe: Probe::Start,
        line: first_line,
    });
    out.extend(body.into_iter().map(TaggedLine::Code));
    let region = OpenRegion {
        label: Some(WHOLE_BODY.to_string()),
    };
    close(&mut out, region, 0, last_line, check_too_fast);
    out
}

fn close(out: &mut Vec<TaggedLine>, region: OpenRegion, level: usize, line: usize, guard: bool) {
    let region = region.label.unwrap_or_else(|| EMPTY_REGION.to_string());
    if guard {
        out.push(TaggedLine::Probe {
            level,
            probe: Probe::Accumulate {
                region: region.clone(),
            },
            line,
        });
        out.push(TaggedLine::Probe {
            level,
            probe: Probe::Guard { region },
            line,
        });
    } else {
        out.push(TaggedLine::Probe {
            level,
            probe: Probe::Accumulate { region },
            line,
        });
    }
}

fn unbalanced(function: &str, line: &SourceLine, expected: &'static str) -> BenchError {
    BenchError::UnbalancedRegionMarkers {
        function: function.to_string(),
        line: line.line,
        expected,
        text: line.text.clone(),
    }
}
