use lockbench_driver::{LockResult, NanoRange};

const THOUSAND: u64 = 1_000;
const MILLION: u64 = 1_000_000;
const BILLION: u64 = 1_000_000_000;

/// Formats an iteration count: raw under 1 000, else `<N>k`, `<N.NN>m`,
/// `<N.NN>b`.
pub fn format_count(n: u64) -> String {
    if n < THOUSAND {
        n.to_string()
    } else if n < MILLION {
        format!("{}k", n / THOUSAND)
    } else if n < BILLION {
        format!("{:.2}m", n as f64 / MILLION as f64)
    } else {
        format!("{:.2}b", n as f64 / BILLION as f64)
    }
}

/// Same suffix scheme as [`format_count`], for the floating-point mean.
pub fn format_count_f64(n: f64) -> String {
    if n < THOUSAND as f64 {
        format!("{n:.2}")
    } else if n < MILLION as f64 {
        format!("{:.2}k", n / THOUSAND as f64)
    } else if n < BILLION as f64 {
        format!("{:.2}m", n / MILLION as f64)
    } else {
        format!("{:.2}b", n / BILLION as f64)
    }
}

/// Formats a nanosecond duration, stepping up through `ns`/`us`/`ms`/`s`
/// with two decimals past the base unit.
pub fn format_latency_ns(ns: u64) -> String {
    if ns < THOUSAND {
        format!("{ns}ns")
    } else if ns < MILLION {
        format!("{:.2}us", ns as f64 / THOUSAND as f64)
    } else if ns < BILLION {
        format!("{:.2}ms", ns as f64 / MILLION as f64)
    } else {
        format!("{:.2}s", ns as f64 / BILLION as f64)
    }
}

/// Formats a LOCKED/UNLOCKED work unit as it appeared on the CLI.
pub fn format_nano_range(range: NanoRange) -> String {
    match range {
        NanoRange::Fixed(n) => format_latency_ns(n),
        NanoRange::Range(lo, hi) => format!("{}-{}", format_latency_ns(lo), format_latency_ns(hi)),
    }
}

/// Prints the header line for one point in the benchmark matrix.
pub fn print_config_header(measure_nanos: u64, threads: usize, locked: NanoRange, unlocked: NanoRange) {
    println!(
        "measure={} threads={} locked={} unlocked={}",
        format_latency_ns(measure_nanos),
        threads,
        format_nano_range(locked),
        format_nano_range(unlocked),
    );
    println!("{}", "-".repeat(91));
    println!(
        "{:<18} | {:>6} | {:>6} | {:>6} | {:>6} | {:>6} | {:>9} | {:>9} |",
        "name", "mean", "stdev", "min", "max", "sum", "lat. <50%", "lat. <99%"
    );
}

/// Prints one lock algorithm's result row under a header printed by
/// [`print_config_header`].
pub fn print_result_row(result: &LockResult) {
    println!(
        "{:<18} | {:>6} | {:>6} | {:>6} | {:>6} | {:>6} | {:>9} | {:>9} |",
        result.name,
        format_count_f64(result.mean),
        format_count_f64(result.stdev),
        format_count(result.min),
        format_count(result.max),
        format_count(result.sum),
        format_latency_ns(result.lat_p50_ns),
        format_latency_ns(result.lat_p99_ns),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_formats_raw_under_a_thousand() {
        assert_eq!(format_count(999), "999");
    }

    #[test]
    fn count_formats_thousands_without_decimals() {
        assert_eq!(format_count(12_345), "12k");
    }

    #[test]
    fn count_formats_millions_and_billions_with_two_decimals() {
        assert_eq!(format_count(2_500_000), "2.50m");
        assert_eq!(format_count(3_000_000_000), "3.00b");
    }

    #[test]
    fn latency_steps_up_through_units() {
        assert_eq!(format_latency_ns(500), "500ns");
        assert_eq!(format_latency_ns(1_500), "1.50us");
        assert_eq!(format_latency_ns(2_500_000), "2.50ms");
        assert_eq!(format_latency_ns(1_500_000_000), "1.50s");
    }

    #[test]
    fn nano_range_formats_fixed_and_range() {
        assert_eq!(format_nano_range(NanoRange::Fixed(100)), "100ns");
        assert_eq!(format_nano_range(NanoRange::Range(100, 500)), "100ns-500ns");
    }
}
