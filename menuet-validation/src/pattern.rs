// Path patterns over schema registration names

use menuet_core::Error;
use regex::Regex;
use std::fmt;

/// Glob over `/`-separated names.
///
/// `*` as a whole segment matches exactly one segment, `**` matches one or
/// more segments, and a `*` inside a segment matches any run of characters
/// other than `/`.
#[derive(Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let trimmed = pattern.trim_matches('/');
        let body = trimmed
            .split('/')
            .map(segment_regex)
            .collect::<Vec<_>>()
            .join("/");

        let regex = Regex::new(&format!("^{}$", body)).map_err(|e| {
            Error::Config(format!("invalid schema path pattern '{}': {}", pattern, e))
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name.trim_matches('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn segment_regex(segment: &str) -> String {
    match segment {
        "**" => "[^/]+(?:/[^/]+)*".to_string(),
        "*" => "[^/]+".to_string(),
        _ => segment
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("[^/]*"),
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.source).finish()
    }
}
