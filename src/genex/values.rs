//! String conventions shared by the evaluator and the resolver.
//!
//! Lists are `;`-separated with empty items skipped. Truth values follow the
//! usual build-description spellings (`ON`, `YES`, `TRUE`, ...).

use std::cmp::Ordering;

const TRUE_WORDS: [&str; 5] = ["1", "ON", "YES", "TRUE", "Y"];
const FALSE_WORDS: [&str; 7] = ["0", "OFF", "NO", "FALSE", "N", "IGNORE", "NOTFOUND"];

/// Whether `value` spells a true constant.
///
/// ```
/// use tsunagi::genex::is_on;
/// assert!(is_on("yes"));
/// assert!(is_on("42"));
/// assert!(!is_on("maybe"));
/// ```
#[must_use]
pub fn is_on(value: &str) -> bool {
    TRUE_WORDS
        .iter()
        .any(|word| value.eq_ignore_ascii_case(word))
        || value.parse::<i64>().is_ok_and(|n| n != 0)
}

/// Whether `value` spells a false constant. The empty string and
/// `*-NOTFOUND` are false.
#[must_use]
pub fn is_off(value: &str) -> bool {
    value.is_empty()
        || FALSE_WORDS
            .iter()
            .any(|word| value.eq_ignore_ascii_case(word))
        || value.to_ascii_uppercase().ends_with("-NOTFOUND")
        || value.parse::<i64>().is_ok_and(|n| n == 0)
}

/// Iterate the non-empty items of a `;`-separated list.
pub fn list_items(list: &str) -> impl Iterator<Item = &str> {
    list.split(';').filter(|item| !item.is_empty())
}

/// Append `items` to `out` skipping ones already present.
pub(crate) fn extend_unique<I>(out: &mut Vec<String>, items: I)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    for item in items {
        let item = item.as_ref();
        if !out.iter().any(|existing| existing == item) {
            out.push(item.to_owned());
        }
    }
}

/// Compare dotted version strings component-wise. Missing components count
/// as zero and non-digit suffixes are ignored.
#[must_use]
pub fn compare_versions(lhs: &str, rhs: &str) -> Ordering {
    let parse = |version: &str| -> Vec<u64> {
        version
            .split('.')
            .map(|part| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    };
    let left = parse(lhs);
    let right = parse(rhs);
    let len = left.len().max(right.len());
    (0..len)
        .map(|idx| {
            let a = left.get(idx).copied().unwrap_or(0);
            let b = right.get(idx).copied().unwrap_or(0);
            a.cmp(&b)
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}
