//! Durations in the syntax eksctl accepts (`20m0s`, `1h30m0s`, `500ms`)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Largest duration eksctl accepts (an `int64` count of nanoseconds)
const MAX_NANOS: u128 = i64::MAX as u128;

/// A duration that parses and prints like eksctl's duration flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeout(pub Duration);

impl ApiTimeout {
    pub fn from_mins(mins: u64) -> Self {
        ApiTimeout(Duration::from_secs(mins * 60))
    }
}

impl Default for ApiTimeout {
    fn default() -> Self {
        ApiTimeout::from_mins(20)
    }
}

impl FromStr for ApiTimeout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err("empty duration".to_string());
        }
        if input == "0" {
            return Ok(ApiTimeout(Duration::ZERO));
        }

        let mut total_nanos: u128 = 0;
        let mut rest = input;
        while !rest.is_empty() {
            let number_len = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .ok_or_else(|| format!("missing unit in duration '{}'", input))?;
            if number_len == 0 {
                return Err(format!("invalid duration '{}'", input));
            }
            let value: f64 = rest[..number_len]
                .parse()
                .map_err(|_| format!("invalid number in duration '{}'", input))?;
            rest = &rest[number_len..];

            let unit_len = rest
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(rest.len());
            let unit_nanos: f64 = match &rest[..unit_len] {
                "h" => 3_600e9,
                "m" => 60e9,
                "s" => 1e9,
                "ms" => 1e6,
                "us" | "µs" => 1e3,
                "ns" => 1.0,
                unit => return Err(format!("unknown unit '{}' in duration '{}'", unit, input)),
            };
            rest = &rest[unit_len..];
            total_nanos = total_nanos
                .checked_add((value * unit_nanos).round() as u128)
                .filter(|n| *n <= MAX_NANOS)
                .ok_or_else(|| format!("invalid duration '{}'", input))?;
        }

        let secs = (total_nanos / 1_000_000_000) as u64;
        let nanos = (total_nanos % 1_000_000_000) as u32;
        Ok(ApiTimeout(Duration::new(secs, nanos)))
    }
}

impl fmt::Display for ApiTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;
        if d.is_zero() {
            return write!(f, "0s");
        }
        if d < Duration::from_secs(1) {
            let nanos = d.subsec_nanos();
            return if nanos % 1_000_000 == 0 {
                write!(f, "{}ms", nanos / 1_000_000)
            } else if nanos % 1_000 == 0 {
                write!(f, "{}µs", nanos / 1_000)
            } else {
                write!(f, "{}ns", nanos)
            };
        }

        let total = d.as_secs();
        let hours = total / 3600;
        let mins = (total % 3600) / 60;
        let secs = total % 60;
        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if hours > 0 || mins > 0 {
            write!(f, "{}m", mins)?;
        }
        write!(f, "{}", secs)?;
        let frac = d.subsec_nanos();
        if frac > 0 {
            let digits = format!("{:09}", frac);
            write!(f, ".{}", digits.trim_end_matches('0'))?;
        }
        write!(f, "s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_twenty_minutes() {
        assert_eq!(ApiTimeout::default().to_string(), "20m0s");
    }

    #[test]
    fn test_parse_compound_durations() {
        let t: ApiTimeout = "1h30m".parse().unwrap();
        assert_eq!(t.0, Duration::from_secs(5400));
        assert_eq!(t.to_string(), "1h30m0s");

        let t: ApiTimeout = "45s".parse().unwrap();
        assert_eq!(t.to_string(), "45s");

        let t: ApiTimeout = "2h".parse().unwrap();
        assert_eq!(t.to_string(), "2h0m0s");
    }

    #[test]
    fn test_fractional_and_subsecond() {
        let t: ApiTimeout = "1.5s".parse().unwrap();
        assert_eq!(t.0, Duration::from_millis(1500));
        assert_eq!(t.to_string(), "1.5s");

        let t: ApiTimeout = "500ms".parse().unwrap();
        assert_eq!(t.to_string(), "500ms");

        let t: ApiTimeout = "0".parse().unwrap();
        assert_eq!(t.to_string(), "0s");
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!("".parse::<ApiTimeout>().is_err());
        assert!("20".parse::<ApiTimeout>().is_err());
        assert!("20x".parse::<ApiTimeout>().is_err());
        assert!("m20".parse::<ApiTimeout>().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_durations() {
        let many_nines = format!("{}h1h", "9".repeat(40));
        assert_eq!(
            many_nines.parse::<ApiTimeout>(),
            Err(format!("invalid duration '{}'", many_nines))
        );
        assert!("99999999999999999999h".parse::<ApiTimeout>().is_err());
        assert!("2562048h".parse::<ApiTimeout>().is_err());

        let t: ApiTimeout = "2562047h".parse().unwrap();
        assert_eq!(t.to_string(), "2562047h0m0s");
    }
}
