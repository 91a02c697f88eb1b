//! Address batch parsing and lexical validation of IP literals.

use std::collections::HashSet;

/// Sample batch mixing every supported separator and both address families.
pub const SAMPLE_ADDRESSES: &str = "101.133.148.169
103.203.56.1, 103.203.57.3
104.28.89.57 106.75.30.104
112.4.101.27; 13.86.115.177
165.232.117.4
2001:4860:4860::8888
2001:4860:4860::8844
::1
2001:db8::1, 2001:db8::2";

const MAPPED_PREFIX: &str = "::ffff:";
const DISPLAY_LIMIT: usize = 20;
const DISPLAY_KEEP: usize = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    V4,
    V6,
    /// `::ffff:` followed by a dotted quad.
    MappedV4,
}

/// Splits pasted text into a deduplicated list of IP literals.
///
/// Tokens are separated by whitespace (newlines included) and by `,`, `;`
/// and `|`. Tokens that are not a single IP literal are dropped without
/// notice. The first occurrence of each address wins its position.
pub fn parse(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut addresses = Vec::new();
    for token in tokens(text) {
        if is_valid(token) && seen.insert(token) {
            addresses.push(token.to_owned());
        }
    }
    addresses
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .flat_map(|line| line.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '|')))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn is_valid(token: &str) -> bool {
    classify(token).is_some()
}

/// Returns the literal shape of `token`, or `None` when it is not a single
/// host address. Only the lexical form is checked.
pub fn classify(token: &str) -> Option<AddressKind> {
    if is_ipv4(token) {
        return Some(AddressKind::V4);
    }
    if let Some(rest) = strip_mapped_prefix(token) {
        if is_ipv4(rest) {
            return Some(AddressKind::MappedV4);
        }
    }
    if is_ipv6(token) {
        return Some(AddressKind::V6);
    }
    None
}

fn strip_mapped_prefix(token: &str) -> Option<&str> {
    let head = token.get(..MAPPED_PREFIX.len())?;
    if head.eq_ignore_ascii_case(MAPPED_PREFIX) {
        token.get(MAPPED_PREFIX.len()..)
    } else {
        None
    }
}

fn is_ipv4(token: &str) -> bool {
    let mut count = 0;
    for octet in token.split('.') {
        count += 1;
        if count > 4 || !is_octet(octet) {
            return false;
        }
    }
    count == 4
}

// Leading zeros are tolerated as long as the octet has at most three digits.
fn is_octet(octet: &str) -> bool {
    (1..=3).contains(&octet.len())
        && octet.bytes().all(|b| b.is_ascii_digit())
        && octet.parse::<u16>().is_ok_and(|value| value <= 255)
}

fn is_ipv6(token: &str) -> bool {
    match token.split_once("::") {
        None => groups(token).is_some_and(|count| count == 8),
        Some((head, tail)) => {
            if tail.contains("::") {
                return false;
            }
            let Some(left) = groups(head) else {
                return false;
            };
            let Some(right) = groups(tail) else {
                return false;
            };
            left + right <= 7
        }
    }
}

/// Counts colon-separated hex groups; `None` if any group is malformed.
/// An empty string has zero groups.
fn groups(part: &str) -> Option<usize> {
    if part.is_empty() {
        return Some(0);
    }
    let mut count = 0;
    for group in part.split(':') {
        if !(1..=4).contains(&group.len()) || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        count += 1;
    }
    Some(count)
}

/// Shortens long IPv6 literals for table cells.
pub fn format_for_display(address: &str) -> String {
    if address.contains(':') && address.chars().count() > DISPLAY_LIMIT {
        let head: String = address.chars().take(DISPLAY_KEEP).collect();
        format!("{head}...")
    } else {
        address.to_owned()
    }
}

/// Parsed batch together with its per-family breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressBatch {
    pub addresses: Vec<String>,
    pub ipv4: usize,
    pub ipv6: usize,
}

impl AddressBatch {
    pub fn from_text(text: &str) -> Self {
        Self::from_addresses(parse(text))
    }

    pub fn from_addresses(addresses: Vec<String>) -> Self {
        let ipv6 = addresses.iter().filter(|a| a.contains(':')).count();
        Self {
            ipv4: addresses.len() - ipv6,
            ipv6,
            addresses,
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Newline-joined form, which parses back to the same batch.
    pub fn to_text(&self) -> String {
        self.addresses.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octet_bounds() {
        assert!(is_octet("0"));
        assert!(is_octet("255"));
        assert!(is_octet("007"));
        assert!(!is_octet("256"));
        assert!(!is_octet("0001"));
        assert!(!is_octet(""));
        assert!(!is_octet("+1"));
    }

    #[test]
    fn group_counting() {
        assert_eq!(groups(""), Some(0));
        assert_eq!(groups("2001:db8"), Some(2));
        assert_eq!(groups(":1"), None);
        assert_eq!(groups("12345"), None);
        assert_eq!(groups("g1"), None);
    }

    #[test]
    fn mapped_prefix_is_case_insensitive() {
        assert_eq!(strip_mapped_prefix("::FFFF:1.2.3.4"), Some("1.2.3.4"));
        assert_eq!(strip_mapped_prefix("::1"), None);
    }
}
