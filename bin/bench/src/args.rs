use lockbench_driver::NanoRange;
use lockbench_locks::LockKind;
use thiserror::Error;

/// Everything that can go wrong turning the CLI's CSV/range grammar into a
/// resolved benchmark matrix. Modeled on `xtask::TaskError`: plain
/// `#[error("...")]` variants, one carrying the offending substring.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// A positional CSV argument was empty or all-whitespace.
    #[error("argument list must not be empty")]
    Empty,
    /// An item didn't parse as `<integer>(ns|us|ms|s)`.
    #[error("invalid time value {0:?}: expected <integer> followed by ns, us, ms, or s")]
    InvalidTime(String),
    /// A LOCKED/UNLOCKED range had `lo >= hi`.
    #[error("time range {0:?} must have a low endpoint strictly less than the high endpoint")]
    InvertedTimeRange(String),
    /// MEASURE items may not be ranges.
    #[error("MEASURE does not accept ranges, got {0:?}")]
    MeasureRangeNotAllowed(String),
    /// An item didn't parse as `<integer>` or `<lo>-<hi>`.
    #[error("invalid thread count {0:?}: expected <integer> or <lo>-<hi>")]
    InvalidThreadCount(String),
    /// A THREADS range had `lo > hi`.
    #[error("thread range {0:?} must have a low endpoint no greater than the high endpoint")]
    InvertedThreadRange(String),
    /// THREADS items may not carry a unit.
    #[error("THREADS does not accept units, got {0:?}")]
    ThreadUnitNotAllowed(String),
    /// A `--locks` entry didn't match any known [`LockKind`].
    #[error("unknown lock name {0:?}")]
    UnknownLockName(String),
    /// A `--locks` entry named a kind unavailable on this platform.
    #[error("lock {0:?} is not available on this platform")]
    LockUnavailable(String),
}

fn split_csv(s: &str) -> Result<Vec<&str>, ArgsError> {
    if s.trim().is_empty() {
        return Err(ArgsError::Empty);
    }
    Ok(s.split(',').map(str::trim).collect())
}

/// Parses one `<integer><unit>` item into nanoseconds.
fn parse_time(item: &str) -> Result<u64, ArgsError> {
    let split_at = item
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ArgsError::InvalidTime(item.to_string()))?;
    let (digits, unit) = item.split_at(split_at);
    if digits.is_empty() {
        return Err(ArgsError::InvalidTime(item.to_string()));
    }
    let value: u64 = digits.parse().map_err(|_| ArgsError::InvalidTime(item.to_string()))?;
    let multiplier: u64 = match unit {
        "ns" => 1,
        "us" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        _ => return Err(ArgsError::InvalidTime(item.to_string())),
    };
    value.checked_mul(multiplier).ok_or_else(|| ArgsError::InvalidTime(item.to_string()))
}

/// Parses the `MEASURE` positional: a CSV of fixed `<time>` items, no ranges.
pub fn parse_measure_csv(s: &str) -> Result<Vec<u64>, ArgsError> {
    split_csv(s)?.into_iter().map(parse_measure_item).collect()
}

fn parse_measure_item(item: &str) -> Result<u64, ArgsError> {
    if item.contains('-') {
        return Err(ArgsError::MeasureRangeNotAllowed(item.to_string()));
    }
    parse_time(item)
}

/// Parses the `THREADS` positional: a CSV of `<integer>` or `<lo>-<hi>`
/// items, expanded inclusively.
pub fn parse_threads_csv(s: &str) -> Result<Vec<usize>, ArgsError> {
    let mut threads = Vec::new();
    for item in split_csv(s)? {
        if item.chars().any(|c| c.is_ascii_alphabetic()) {
            return Err(ArgsError::ThreadUnitNotAllowed(item.to_string()));
        }
        if let Some((lo, hi)) = item.split_once('-') {
            let lo: usize = lo.parse().map_err(|_| ArgsError::InvalidThreadCount(item.to_string()))?;
            let hi: usize = hi.parse().map_err(|_| ArgsError::InvalidThreadCount(item.to_string()))?;
            if lo > hi {
                return Err(ArgsError::InvertedThreadRange(item.to_string()));
            }
            threads.extend(lo..=hi);
        } else {
            let n: usize = item.parse().map_err(|_| ArgsError::InvalidThreadCount(item.to_string()))?;
            threads.push(n);
        }
    }
    Ok(threads)
}

/// Parses a `LOCKED`/`UNLOCKED` positional: a CSV of `<time>` or
/// `<time>-<time>` items.
pub fn parse_nano_range_csv(s: &str) -> Result<Vec<NanoRange>, ArgsError> {
    split_csv(s)?.into_iter().map(parse_nano_range_item).collect()
}

fn parse_nano_range_item(item: &str) -> Result<NanoRange, ArgsError> {
    if let Some((lo, hi)) = item.split_once('-') {
        let lo_ns = parse_time(lo)?;
        let hi_ns = parse_time(hi)?;
        if lo_ns >= hi_ns {
            return Err(ArgsError::InvertedTimeRange(item.to_string()));
        }
        Ok(NanoRange::Range(lo_ns, hi_ns))
    } else {
        Ok(NanoRange::Fixed(parse_time(item)?))
    }
}

/// Resolves `--locks` (or its absence) into the concrete set of kinds to
/// benchmark, validating names and platform availability up front.
pub fn resolve_locks(locks: Option<&[String]>) -> Result<Vec<LockKind>, ArgsError> {
    match locks {
        None => Ok(LockKind::ALL.iter().copied().filter(|k| k.is_available()).collect()),
        Some(names) => names
            .iter()
            .map(|name| {
                let kind = LockKind::from_name(name).ok_or_else(|| ArgsError::UnknownLockName(name.clone()))?;
                if !kind.is_available() {
                    return Err(ArgsError::LockUnavailable(name.clone()));
                }
                Ok(kind)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_rejects_missing_unit() {
        assert!(matches!(parse_measure_csv("1"), Err(ArgsError::InvalidTime(_))));
    }

    #[test]
    fn measure_rejects_ranges() {
        assert!(matches!(parse_measure_csv("1ns-2ns"), Err(ArgsError::MeasureRangeNotAllowed(_))));
    }

    #[test]
    fn measure_parses_every_unit() {
        assert_eq!(parse_measure_csv("1ns,1us,1ms,1s").unwrap(), vec![1, 1_000, 1_000_000, 1_000_000_000]);
    }

    #[test]
    fn threads_expands_inclusive_range() {
        assert_eq!(parse_threads_csv("2-4").unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn threads_rejects_inverted_range() {
        assert!(matches!(parse_threads_csv("5-3"), Err(ArgsError::InvertedThreadRange(_))));
    }

    #[test]
    fn threads_rejects_units() {
        assert!(matches!(parse_threads_csv("4ns"), Err(ArgsError::ThreadUnitNotAllowed(_))));
    }

    #[test]
    fn nano_range_parses_fixed_and_range() {
        assert_eq!(parse_nano_range_csv("1ns,100ns-500ns").unwrap(), vec![
            NanoRange::Fixed(1),
            NanoRange::Range(100, 500),
        ]);
    }

    #[test]
    fn nano_range_rejects_inverted_bounds() {
        assert!(matches!(parse_nano_range_csv("500ns-100ns"), Err(ArgsError::InvertedTimeRange(_))));
    }

    #[test]
    fn empty_csv_is_rejected() {
        assert!(matches!(parse_measure_csv("  "), Err(ArgsError::Empty)));
    }

    #[test]
    fn resolve_locks_defaults_to_every_available_kind() {
        let resolved = resolve_locks(None).unwrap();
        assert!(resolved.iter().all(|k| k.is_available()));
        assert!(resolved.contains(&LockKind::Spin));
    }

    #[test]
    fn resolve_locks_rejects_unknown_name() {
        let names = vec!["not_a_lock".to_string()];
        assert!(matches!(resolve_locks(Some(&names)), Err(ArgsError::UnknownLockName(_))));
    }
}
