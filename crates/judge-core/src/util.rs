//! Utility functions for judge operations

use crate::error::{JudgeError, Result};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Parse memory size string (e.g., "100M", "1G")
pub fn parse_memory_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();

    let (num_str, multiplier) = if let Some(num) = s.strip_suffix('G') {
        (num, GIB)
    } else if let Some(num) = s.strip_suffix('M') {
        (num, MIB)
    } else if let Some(num) = s.strip_suffix('K') {
        (num, KIB)
    } else if let Some(num) = s.strip_suffix('B') {
        (num, 1u64)
    } else {
        (s.as_str(), 1u64)
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| JudgeError::InvalidConfig(format!("Invalid memory size: {}", s)))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| JudgeError::InvalidConfig(format!("Memory size overflow: {}", s)))
}

/// Render a byte count with a binary unit, one decimal place above 1 KiB.
pub fn format_bytes(bytes: u64) -> String {
    match bytes {
        b if b >= GIB => format!("{:.1} GiB", b as f64 / GIB as f64),
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{} B", b),
    }
}

/// Upper bound on the number of tests a selection may name
pub const MAX_SELECTED_TESTS: usize = 10_000;

/// Parse a test selection such as `1-3,5` into a sorted, de-duplicated list.
///
/// Selections naming more than [`MAX_SELECTED_TESTS`] tests are rejected.
pub fn parse_test_selection(s: &str) -> Result<Vec<u32>> {
    let invalid = || JudgeError::InvalidConfig(format!("Invalid test selection: {}", s));
    let too_many = || {
        JudgeError::InvalidConfig(format!(
            "Test selection names more than {} tests",
            MAX_SELECTED_TESTS
        ))
    };

    let mut tests = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.trim().parse().map_err(|_| invalid())?;
                let hi: u32 = hi.trim().parse().map_err(|_| invalid())?;
                if lo > hi {
                    return Err(invalid());
                }
                let span = (hi - lo) as usize + 1;
                if tests.len() + span > MAX_SELECTED_TESTS {
                    return Err(too_many());
                }
                tests.extend(lo..=hi);
            }
            None => {
                if tests.len() >= MAX_SELECTED_TESTS {
                    return Err(too_many());
                }
                tests.push(part.parse().map_err(|_| invalid())?);
            }
        }
    }

    if tests.is_empty() {
        return Err(invalid());
    }

    tests.sort_unstable();
    tests.dedup();
    Ok(tests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_size_bytes() {
        assert_eq!(parse_memory_size("100").unwrap(), 100);
        assert_eq!(parse_memory_size("100B").unwrap(), 100);
    }

    #[test]
    fn test_parse_memory_size_units() {
        assert_eq!(parse_memory_size("10K").unwrap(), 10 * 1024);
        assert_eq!(parse_memory_size("64M").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_memory_size("2G").unwrap(), 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_memory_size_case_and_whitespace() {
        assert_eq!(parse_memory_size("  1m ").unwrap(), 1024 * 1024);
    }

    #[test]
    fn test_parse_memory_size_invalid() {
        assert!(parse_memory_size("not_a_number").is_err());
        assert!(parse_memory_size("10X").is_err());
        assert!(parse_memory_size("99999999999999999999G").is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(64 * 1024 * 1024), "64.0 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn test_parse_test_selection_ranges() {
        assert_eq!(parse_test_selection("1-3,5").unwrap(), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_parse_test_selection_sorts_and_dedups() {
        assert_eq!(parse_test_selection("4,2-4, 1").unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_test_selection_invalid() {
        assert!(parse_test_selection("").is_err());
        assert!(parse_test_selection("a-b").is_err());
        assert!(parse_test_selection("5-2").is_err());
    }

    #[test]
    fn test_parse_test_selection_is_bounded() {
        let err = parse_test_selection("1-4000000000").unwrap_err();
        assert!(err.to_string().contains("more than 10000 tests"), "{}", err);
        assert!(parse_test_selection("1-5000,6000-11000").is_err());

        let all = parse_test_selection("1-10000").unwrap();
        assert_eq!(all.len(), MAX_SELECTED_TESTS);
    }
}
