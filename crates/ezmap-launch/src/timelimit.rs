//! Timelimit grammar (spec §6): `SS`, `HH:MM`, `HH:MM:SS`, or
//! `D:HH:MM:SS` with `D ≤ 31`.

use ezmap_core::error::{EzmapError, Result};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;
const MAX_DAYS: u64 = 31;

fn bad(s: &str) -> EzmapError {
    EzmapError::Config(format!("unparseable timelimit `{s}`"))
}

fn parse_component(s: &str, original: &str) -> Result<u64> {
    s.parse().map_err(|_| bad(original))
}

pub fn iso_to_seconds(s: &str) -> Result<u64> {
    let parts: Vec<&str> = s.split(':').collect();
    let total = match parts.as_slice() {
        [sec] => {
            let sec = parse_component(sec, s)?;
            if sec > 59 {
                return Err(EzmapError::Config(format!(
                    "seconds-only timelimit `{s}` must be ≤ 59"
                )));
            }
            sec
        }
        [h, m] => {
            let h = parse_component(h, s)?;
            let m = parse_component(m, s)?;
            h * SECONDS_PER_HOUR + m * SECONDS_PER_MINUTE
        }
        [h, m, sec] => {
            let h = parse_component(h, s)?;
            let m = parse_component(m, s)?;
            let sec = parse_component(sec, s)?;
            h * SECONDS_PER_HOUR + m * SECONDS_PER_MINUTE + sec
        }
        [d, h, m, sec] => {
            let d = parse_component(d, s)?;
            if d > MAX_DAYS {
                return Err(EzmapError::Config(format!("timelimit `{s}` exceeds {MAX_DAYS} days")));
            }
            let h = parse_component(h, s)?;
            let m = parse_component(m, s)?;
            let sec = parse_component(sec, s)?;
            d * SECONDS_PER_DAY + h * SECONDS_PER_HOUR + m * SECONDS_PER_MINUTE + sec
        }
        _ => return Err(bad(s)),
    };
    Ok(total)
}

/// Canonical `D:HH:MM:SS` rendering; round-trips through [`iso_to_seconds`]
/// for any `s` in `[0, 31·86400)`.
pub fn seconds_to_iso(total: u64) -> String {
    let d = total / SECONDS_PER_DAY;
    let rem = total % SECONDS_PER_DAY;
    let h = rem / SECONDS_PER_HOUR;
    let rem = rem % SECONDS_PER_HOUR;
    let m = rem / SECONDS_PER_MINUTE;
    let s = rem % SECONDS_PER_MINUTE;
    format!("{d}:{h:02}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_across_the_full_domain() {
        for s in [0, 1, 59, 60, 3599, 3600, 86399, 86400, 31 * 86400 - 1] {
            assert_eq!(iso_to_seconds(&seconds_to_iso(s)).unwrap(), s);
        }
    }

    #[test]
    fn parses_each_grammar_form() {
        assert_eq!(iso_to_seconds("45").unwrap(), 45);
        assert_eq!(iso_to_seconds("01:30").unwrap(), 90 * 60);
        assert_eq!(iso_to_seconds("01:00:05").unwrap(), 3605);
        assert_eq!(iso_to_seconds("2:00:00:00").unwrap(), 2 * 86400);
    }

    #[test]
    fn rejects_seconds_only_over_59() {
        assert!(iso_to_seconds("60").is_err());
    }

    #[test]
    fn rejects_days_over_31() {
        assert!(iso_to_seconds("32:00:00:00").is_err());
    }
}
