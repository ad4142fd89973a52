//! VLAN range strings.
//!
//! A range string is the canonical text form of a set of VLAN ids:
//! ascending, deduplicated, contiguous runs collapsed to `start-end`,
//! singletons bare, comma-joined (`"1-5,10,12-14"`).

use std::collections::BTreeSet;

use crate::error::{StpError, StpResult};

/// Expands range tokens (`"10"`, `"20-25"`) into a sorted set.
///
/// Fails with a format error for non-numeric tokens or reversed intervals.
pub fn expand<S: AsRef<str>>(tokens: &[S]) -> StpResult<BTreeSet<u16>> {
    let mut values = BTreeSet::new();

    for token in tokens {
        let token = token.as_ref().trim();
        let (start, end) = match token.split_once('-') {
            Some((start, end)) => (parse_value(token, start)?, parse_value(token, end)?),
            None => {
                let value = parse_value(token, token)?;
                (value, value)
            }
        };

        if end < start {
            return Err(StpError::format(format!(
                "Invalid range '{}': end is lower than start",
                token
            )));
        }

        values.extend(start..=end);
    }

    Ok(values)
}

/// Expands a comma-joined range string. An empty string is the empty set.
pub fn expand_str(range: &str) -> StpResult<BTreeSet<u16>> {
    if range.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    let tokens: Vec<&str> = range.split(',').collect();
    expand(&tokens)
}

/// Compresses values into a canonical range string.
pub fn compress<I>(values: I) -> String
where
    I: IntoIterator<Item = u16>,
{
    let values: BTreeSet<u16> = values.into_iter().collect();

    // A lone element is returned as-is
    if values.len() <= 1 {
        return values
            .first()
            .map(|v| v.to_string())
            .unwrap_or_default();
    }

    join_runs(&values)
}

fn join_runs(values: &BTreeSet<u16>) -> String {
    let mut segments = Vec::new();
    let mut iter = values.iter().copied();

    let Some(first) = iter.next() else {
        return String::new();
    };
    let (mut start, mut end) = (first, first);

    for value in iter {
        if u32::from(value) == u32::from(end) + 1 {
            end = value;
            continue;
        }
        segments.push(segment(start, end));
        start = value;
        end = value;
    }
    segments.push(segment(start, end));

    segments.join(",")
}

fn segment(start: u16, end: u16) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

fn parse_value(token: &str, part: &str) -> StpResult<u16> {
    part.trim()
        .parse()
        .map_err(|_| StpError::format(format!("Invalid VLAN range token '{}'", token)))
}
