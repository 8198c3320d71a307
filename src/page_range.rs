use crate::error::{ProcessError, Result};

/// 0-based page indices selected by one range token, in copy order.
pub type PageGroup = Vec<usize>;

/// A parsed range token in 1-based, inclusive, user-facing numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    Single(u32),
    Interval(u32, u32),
}

/// One comma-separated token of a range expression.
///
/// `spec` is `None` when the token did not parse; such a token still occupies
/// its position and resolves to an empty group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeToken {
    pub raw: String,
    pub spec: Option<RangeSpec>,
}

impl RangeSpec {
    /// Parse a single token like "5" or "7-10"
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(dash_pos) = s.find('-') {
            let start = parse_page_number(&s[..dash_pos])?;
            let end = parse_page_number(&s[dash_pos + 1..])?;
            Some(RangeSpec::Interval(start, end))
        } else {
            parse_page_number(s).map(RangeSpec::Single)
        }
    }

    /// Resolve against a document with `total_pages` pages.
    ///
    /// Indices past the end are dropped. An interval whose start is 0 or
    /// greater than its end selects nothing.
    pub fn resolve(&self, total_pages: usize) -> PageGroup {
        match *self {
            RangeSpec::Single(n) => {
                let n = n as usize;
                if n >= 1 && n <= total_pages {
                    vec![n - 1]
                } else {
                    Vec::new()
                }
            }
            RangeSpec::Interval(start, end) => {
                if start == 0 {
                    return Vec::new();
                }
                let end = (end as usize).min(total_pages);
                (start as usize..=end).map(|page| page - 1).collect()
            }
        }
    }

    /// Reject anything `resolve` would silently drop.
    pub fn check_bounds(&self, total_pages: usize) -> Result<()> {
        match *self {
            RangeSpec::Single(n) => {
                if n == 0 || n as usize > total_pages {
                    return Err(ProcessError::Range(format!(
                        "page {} is out of range (1-{})",
                        n, total_pages
                    )));
                }
            }
            RangeSpec::Interval(start, end) => {
                if start == 0 {
                    return Err(ProcessError::Range("page numbers must be >= 1".into()));
                }
                if start > end {
                    return Err(ProcessError::Range(format!(
                        "start page {} is after end page {}",
                        start, end
                    )));
                }
                if end as usize > total_pages {
                    return Err(ProcessError::Range(format!(
                        "end page {} exceeds total pages {}",
                        end, total_pages
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Plain decimal digits only; `u32::from_str` would also take a leading `+`.
fn parse_page_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok()
}

/// Parse a comma-separated expression like "1-3, 5, 7-10".
///
/// Token order is preserved; malformed tokens are kept with no spec.
pub fn parse_ranges(expression: &str) -> Result<Vec<RangeToken>> {
    if expression.trim().is_empty() {
        return Err(ProcessError::validation("page range expression is required"));
    }

    Ok(expression
        .split(',')
        .map(|part| {
            let raw = part.trim().to_string();
            let spec = RangeSpec::parse(&raw);
            RangeToken { raw, spec }
        })
        .collect())
}

/// Resolve every token into a page group, one group per token.
///
/// With `strict` set, malformed or out-of-bounds tokens fail the whole
/// expression instead of producing empty groups.
pub fn resolve_ranges(
    tokens: &[RangeToken],
    total_pages: usize,
    strict: bool,
) -> Result<Vec<PageGroup>> {
    tokens
        .iter()
        .map(|token| match &token.spec {
            Some(spec) => {
                if strict {
                    spec.check_bounds(total_pages)?;
                }
                Ok(spec.resolve(total_pages))
            }
            None if strict => Err(ProcessError::Range(format!(
                "cannot parse page range '{}'",
                token.raw
            ))),
            None => Ok(Vec::new()),
        })
        .collect()
}
