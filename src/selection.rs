//! Operator selection syntax: `3`, `1-4`, `1-4,8`, `all`.

use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("nothing selected")]
    Empty,

    #[error("nothing to select")]
    NothingToSelect,

    #[error("'{0}' is not a number or range")]
    Malformed(String),

    #[error("'{token}' is out of range (1-{max})")]
    OutOfRange { token: String, max: usize },

    #[error("'{0}' is an inverted range")]
    InvertedRange(String),
}

/// Parse `input` into a set of 1-based indices, each within `1..=max_index`.
///
/// `all` (any case) selects the full range regardless of the other tokens.
/// Empty tokens between commas are ignored.
pub fn parse(input: &str, max_index: usize) -> Result<BTreeSet<usize>, SelectionError> {
    let tokens: Vec<&str> = input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(SelectionError::Empty);
    }
    if max_index == 0 {
        return Err(SelectionError::NothingToSelect);
    }
    if tokens.iter().any(|token| token.eq_ignore_ascii_case("all")) {
        return Ok((1..=max_index).collect());
    }

    let mut chosen = BTreeSet::new();
    for token in tokens {
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_bound(start, token, max_index)?;
                let end = parse_bound(end, token, max_index)?;
                if start > end {
                    return Err(SelectionError::InvertedRange(token.to_string()));
                }
                chosen.extend(start..=end);
            }
            None => {
                chosen.insert(parse_bound(token, token, max_index)?);
            }
        }
    }
    Ok(chosen)
}

fn parse_bound(text: &str, token: &str, max_index: usize) -> Result<usize, SelectionError> {
    let value: usize = text
        .trim()
        .parse()
        .map_err(|_| SelectionError::Malformed(token.to_string()))?;
    if value == 0 || value > max_index {
        return Err(SelectionError::OutOfRange {
            token: token.to_string(),
            max: max_index,
        });
    }
    Ok(value)
}
