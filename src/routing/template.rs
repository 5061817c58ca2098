//! Path and upstream URI templates.
//!
//! # Responsibilities
//! - Parse path templates (`/api/posts/{postId}`, `/files/{**rest}`)
//! - Match request paths and capture route parameters
//! - Render upstream URI templates from captured parameters
//!
//! # Design Decisions
//! - Leading/trailing slashes are insignificant
//! - Literal segments match ASCII case-insensitively
//! - A catch-all must be the last segment and may capture an empty remainder
//! - Captured values are kept raw (still percent-encoded) so they can be
//!   spliced into upstream URIs unchanged
//! - Request paths lose their dot segments (`.`, `..`, `%2e%2e`) before
//!   matching, so no capture can climb out of an upstream prefix
//! - No regex: matching is a single left-to-right segment walk

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, InvalidUpstream};

/// Parameters captured from the request path, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    entries: Vec<(String, String)>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value captured for `name`, parsed into `T`.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|value| value.parse().ok())
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RouteParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Compile a path template, rejecting malformed ones.
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = template.trim_matches('/');
        let mut segments = Vec::new();
        if !trimmed.is_empty() {
            for part in trimmed.split('/') {
                if part.is_empty() {
                    return Err(invalid("empty path segment"));
                }
                if matches!(segments.last(), Some(Segment::CatchAll(_))) {
                    return Err(invalid("catch-all parameter must be the last segment"));
                }
                segments.push(parse_segment(part).map_err(|reason| invalid(&reason))?);
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Param(name) | Segment::CatchAll(name) = segment {
                if seen.contains(&name.as_str()) {
                    return Err(invalid(&format!("duplicate parameter `{name}`")));
                }
                seen.push(name);
            }
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Names of all captured parameters.
    pub fn captures(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) | Segment::CatchAll(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let mut params = RouteParams::new();
        let mut rest = path.trim_matches('/');

        for segment in &self.segments {
            if let Segment::CatchAll(name) = segment {
                params.insert(name.clone(), rest);
                return Some(params);
            }
            if rest.is_empty() {
                return None;
            }
            let (head, tail) = rest.split_once('/').unwrap_or((rest, ""));
            match segment {
                Segment::Literal(literal) => {
                    if !head.eq_ignore_ascii_case(literal) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if head.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), head);
                }
                Segment::CatchAll(_) => unreachable!("handled above"),
            }
            rest = tail;
        }

        rest.is_empty().then_some(params)
    }
}

/// Resolve `.` and `..` segments in a request path.
///
/// Percent-encoded dots count as dots and `\` counts as a separator. `..`
/// never climbs above the root.
pub(crate) fn normalize_path(path: &str) -> Cow<'_, str> {
    let is_dot = |segment: &str| dot_count(segment).is_some();
    if !path.split(['/', '\\']).any(is_dot) {
        return Cow::Borrowed(path);
    }

    let mut kept: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']).filter(|segment| !segment.is_empty()) {
        match dot_count(segment) {
            Some(1) => {}
            Some(_) => {
                kept.pop();
            }
            None => kept.push(segment),
        }
    }

    let mut normalized = format!("/{}", kept.join("/"));
    let trailing =
        path.ends_with(['/', '\\']) || path.rsplit(['/', '\\']).next().is_some_and(is_dot);
    if trailing && normalized.len() > 1 {
        normalized.push('/');
    }
    Cow::Owned(normalized)
}

/// `Some(1)` for a `.` segment, `Some(2)` for `..`, `None` otherwise.
fn dot_count(segment: &str) -> Option<usize> {
    let mut rest = segment;
    let mut dots = 0;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('.') {
            rest = tail;
        } else if rest.get(..3).is_some_and(|head| head.eq_ignore_ascii_case("%2e")) {
            rest = &rest[3..];
        } else {
            return None;
        }
        dots += 1;
    }
    (1..=2).contains(&dots).then_some(dots)
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(part: &str) -> Result<Segment, String> {
    let opens = part.matches('{').count();
    let closes = part.matches('}').count();
    if opens == 0 && closes == 0 {
        return Ok(Segment::Literal(part.to_string()));
    }
    if opens != 1 || closes != 1 || !part.starts_with('{') || !part.ends_with('}') {
        return Err(format!(
            "segment `{part}` must be either a literal or a single `{{name}}` parameter"
        ));
    }

    let inner = &part[1..part.len() - 1];
    let (name, catch_all) = match inner.strip_prefix("**").or_else(|| inner.strip_prefix('*')) {
        Some(name) => (name, true),
        None => (inner, false),
    };
    validate_name(name)?;

    Ok(if catch_all {
        Segment::CatchAll(name.to_string())
    } else {
        Segment::Param(name.to_string())
    })
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("parameter name must not be empty".to_string());
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!(
            "parameter name `{name}` may only contain letters, digits and `_`"
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Param(String),
}

/// An upstream URI with `{name}` placeholders filled from route parameters.
#[derive(Debug, Clone)]
pub struct UpstreamTemplate {
    raw: String,
    pieces: Vec<Piece>,
}

impl UpstreamTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidUpstream {
            template: template.to_string(),
            reason,
        };

        let mut pieces = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if rest[..open].contains('}') {
                return Err(invalid("unbalanced `}`".to_string()));
            }
            if open > 0 {
                pieces.push(Piece::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| invalid("unclosed `{`".to_string()))?;
            let inner = &after[..close];
            let name = inner.trim_start_matches('*');
            validate_name(name).map_err(invalid)?;
            pieces.push(Piece::Param(name.to_string()));
            rest = &after[close + 1..];
        }
        if rest.contains('}') {
            return Err(invalid("unbalanced `}`".to_string()));
        }
        if !rest.is_empty() {
            pieces.push(Piece::Literal(rest.to_string()));
        }

        let template = Self {
            raw: template.to_string(),
            pieces,
        };

        // Placeholders filled with a plain token must still yield a usable URI.
        let probe: RouteParams = template.placeholders().map(|name| (name, "x")).collect();
        let rendered = template.render(&probe).map_err(|e| invalid(e.reason))?;
        crate::proxy::resolver::parse_upstream(&rendered).map_err(|e| invalid(e.reason))?;

        Ok(template)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.pieces.iter().filter_map(|piece| match piece {
            Piece::Param(name) => Some(name.as_str()),
            Piece::Literal(_) => None,
        })
    }

    /// Substitute every placeholder with its captured value.
    pub fn render(&self, params: &RouteParams) -> Result<String, InvalidUpstream> {
        let mut out = String::with_capacity(self.raw.len());
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Param(name) => match params.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(InvalidUpstream {
                            uri: self.raw.clone(),
                            reason: format!("no route parameter named `{name}`"),
                        })
                    }
                },
            }
        }
        Ok(out)
    }
}
