//! Page specification parsing
//!
//! Turns user input such as `"1-3, 5, 7-9"` into a set of zero-based page
//! indices bounded by the document's page count. Malformed and out-of-range
//! tokens are dropped silently: a spec that matches nothing resolves to an
//! empty set, and rejecting an empty raw string is left to the caller.

use std::collections::BTreeSet;

/// One comma-separated token of a page specification, as written by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageToken {
    /// A single 1-based page number
    Single(i64),
    /// An inclusive 1-based range. `start > end` is kept as written and selects nothing.
    Range { start: i64, end: i64 },
    /// A token that did not parse; contributes nothing
    Malformed(String),
}

/// A parsed page specification, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSpec {
    tokens: Vec<PageToken>,
}

impl PageSpec {
    /// Tokenize a page specification. Never fails.
    pub fn parse(input: &str) -> Self {
        let tokens = input
            .split(',')
            .map(|part| parse_token(part.trim()))
            .collect();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[PageToken] {
        &self.tokens
    }

    /// Resolve against a document with `page_count` pages
    pub fn resolve(&self, page_count: u32) -> PageIndexSet {
        let last = i64::from(page_count);
        let mut indices = BTreeSet::new();

        for token in &self.tokens {
            match *token {
                PageToken::Single(page) => {
                    if (1..=last).contains(&page) {
                        indices.insert((page - 1) as u32);
                    }
                }
                PageToken::Range { start, end } => {
                    // Clamp first so huge ranges cost O(page_count)
                    let lo = start.max(1);
                    let hi = end.min(last);
                    for page in lo..=hi {
                        indices.insert((page - 1) as u32);
                    }
                }
                PageToken::Malformed(_) => {}
            }
        }

        PageIndexSet {
            indices,
            page_count,
        }
    }
}

fn parse_token(token: &str) -> PageToken {
    if token.contains('-') {
        // Anything after a second hyphen is ignored: "1-2-3" reads as "1-2"
        let mut parts = token.split('-');
        let start = parts.next().and_then(leading_integer);
        let end = parts.next().and_then(leading_integer);
        match (start, end) {
            (Some(start), Some(end)) => PageToken::Range { start, end },
            _ => PageToken::Malformed(token.to_string()),
        }
    } else {
        match leading_integer(token) {
            Some(page) => PageToken::Single(page),
            None => PageToken::Malformed(token.to_string()),
        }
    }
}

/// Read an optionally signed run of digits at the start of `text`, ignoring
/// leading whitespace and whatever follows the digits. `"3abc"` reads as 3.
fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit);
    let mut value: i64 = 0;
    let mut seen = false;
    for digit in digits {
        seen = true;
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'));
    }

    seen.then_some(if negative { -value } else { value })
}

/// Parse `input` and resolve it against a document with `page_count` pages
pub fn parse_page_spec(input: &str, page_count: u32) -> PageIndexSet {
    PageSpec::parse(input).resolve(page_count)
}

/// Unique zero-based page indices, each `< page_count`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageIndexSet {
    indices: BTreeSet<u32>,
    page_count: u32,
}

impl PageIndexSet {
    /// Build from arbitrary indices, dropping any that are out of bounds
    pub fn from_indices<I>(indices: I, page_count: u32) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        Self {
            indices: indices.into_iter().filter(|&i| i < page_count).collect(),
            page_count,
        }
    }

    /// Every page of a document
    pub fn all(page_count: u32) -> Self {
        Self::from_indices(0..page_count, page_count)
    }

    /// Indices in ascending order. Extraction order is defined by this, not by input order.
    pub fn ascending(&self) -> impl Iterator<Item = u32> + '_ {
        self.indices.iter().copied()
    }

    /// 1-based page numbers in ascending order, as lopdf numbers pages
    pub fn page_numbers(&self) -> Vec<u32> {
        self.ascending().map(|i| i + 1).collect()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Page count of the document the set was resolved against
    pub fn page_count(&self) -> u32 {
        self.page_count
    }
}
