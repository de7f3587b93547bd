//! Raw-counter math for one-shot engine stats samples, kept separate from the
//! bollard types so it can be tested against plain numbers.

/// CPU usage percent from the cumulative counters of two consecutive samples,
/// scaled by the number of online CPUs (matches `docker stats`).
pub fn cpu_percent(cpu_delta: u64, system_delta: u64, online_cpus: u64) -> f64 {
    if system_delta == 0 {
        return 0.0;
    }
    (cpu_delta as f64 / system_delta as f64) * online_cpus.max(1) as f64 * 100.0
}

pub fn usage_percent(usage: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    (usage as f64 / limit as f64) * 100.0
}

pub fn format_bytes(size: u64) -> String {
    let mut size = size as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} PB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_percent_scales_by_online_cpus() {
        // 25% of total system time across 4 CPUs reads as 100%.
        assert_eq!(cpu_percent(250, 1000, 4), 100.0);
        assert_eq!(cpu_percent(250, 1000, 1), 25.0);
    }

    #[test]
    fn cpu_percent_handles_zero_system_delta() {
        assert_eq!(cpu_percent(100, 0, 4), 0.0);
    }

    #[test]
    fn usage_percent_handles_zero_limit() {
        assert_eq!(usage_percent(512, 1024), 50.0);
        assert_eq!(usage_percent(512, 0), 0.0);
    }

    #[test]
    fn format_bytes_picks_sensible_units() {
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
