//! Page-range parsing
//!
//! Turns free text such as `"1, 3, 5-10"` into a sorted set of page numbers
//! and back. Parsing never fails: tokens that are not numbers, or that fall
//! entirely outside `1..=max`, are skipped.

use std::collections::BTreeSet;

/// Parse a page-range string into sorted, deduplicated page numbers.
///
/// Tokens are separated by commas and/or whitespace. Each token is a single
/// page (`7`) or an inclusive range (`5-10`, `10-5`). Ranges reaching past
/// `max` contribute only their in-bounds pages.
pub fn parse_page_range(input: &str, max: u32) -> Vec<u32> {
    let mut pages = BTreeSet::new();
    let max = u64::from(max);

    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        match token.split_once('-') {
            Some((start, end)) => {
                let (Some(start), Some(end)) = (parse_number(start), parse_number(end)) else {
                    continue;
                };
                let low = start.min(end).max(1);
                let high = start.max(end).min(max);
                if low <= high {
                    pages.extend((low..=high).map(|page| page as u32));
                }
            }
            None => {
                if let Some(page) = parse_number(token) {
                    if (1..=max).contains(&page) {
                        pages.insert(page as u32);
                    }
                }
            }
        }
    }

    pages.into_iter().collect()
}

/// Render page numbers as a canonical range string, e.g. `"1, 3, 5-10"`.
///
/// Feeding the result back into [`parse_page_range`] reproduces the input
/// set.
pub fn format_page_ranges(pages: &[u32]) -> String {
    let mut sorted = pages.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts = Vec::new();
    let mut iter = sorted.into_iter().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while let Some(next) = end.checked_add(1) {
            if iter.peek() != Some(&next) {
                break;
            }
            end = next;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{}-{}", start, end));
        }
    }

    parts.join(", ")
}

fn parse_number(text: &str) -> Option<u64> {
    text.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singles_and_ranges() {
        assert_eq!(
            parse_page_range("1, 3, 5-10", 12),
            vec![1, 3, 5, 6, 7, 8, 9, 10]
        );
    }

    #[test]
    fn test_reversed_range_is_clipped() {
        assert_eq!(
            parse_page_range("20-5", 12),
            vec![5, 6, 7, 8, 9, 10, 11, 12]
        );
    }

    #[test]
    fn test_garbage_tokens_are_dropped() {
        assert_eq!(parse_page_range("abc,2", 5), vec![2]);
        assert_eq!(parse_page_range("x-3, 4-y, 2.5, -", 5), Vec::<u32>::new());
        assert_eq!(parse_page_range("0, 6, 99999999999999999999", 5), Vec::<u32>::new());
    }

    #[test]
    fn test_whitespace_and_duplicates() {
        assert_eq!(parse_page_range("  4 2\t2,,4  1-2 ", 10), vec![1, 2, 4]);
        assert!(parse_page_range("", 10).is_empty());
        assert!(parse_page_range("1-3", 0).is_empty());
    }

    #[test]
    fn test_format_collapses_runs() {
        assert_eq!(format_page_ranges(&[1, 3, 5, 6, 7, 8, 9, 10]), "1, 3, 5-10");
        assert_eq!(format_page_ranges(&[7, 2, 3, 2]), "2-3, 7");
        assert_eq!(format_page_ranges(&[]), "");
    }

    #[test]
    fn test_format_handles_largest_page_number() {
        assert_eq!(
            format_page_ranges(&[u32::MAX, u32::MAX - 1, 1]),
            format!("1, {}-{}", u32::MAX - 1, u32::MAX)
        );
        assert_eq!(format_page_ranges(&[u32::MAX]), u32::MAX.to_string());
    }

    #[test]
    fn test_parse_is_idempotent_over_format() {
        for input in ["1, 3, 5-10", "20-5", "abc,2", "9 8 7 1 2", "1-1, 3-2"] {
            let first = parse_page_range(input, 12);
            let second = parse_page_range(&format_page_ranges(&first), 12);
            assert_eq!(first, second, "input {:?}", input);
        }
    }
}
