//! Normalization primitives shared by the override catalog.
//!
//! Pure functions only: time quantization and the table that redirects
//! local-time calendar accessors to their UTC counterparts.

use serde::{Deserialize, Serialize};

use super::profile::NormalizedProfile;

/// Round a millisecond value to the nearest time bucket (100ms).
///
/// Values exactly halfway between two buckets round up, toward positive
/// infinity, as `Math.round` does (-150 becomes -100). Results near bucket
/// edges are not monotonic across calls; that is accepted entropy reduction.
#[inline]
pub fn quantize_time(raw: f64) -> f64 {
    let bucket = NormalizedProfile::TIME_BUCKET_MS;
    // + 0.0 folds -0.0 into 0.0
    (raw / bucket + 0.5).floor() * bucket + 0.0
}

/// Calendar fields that have a local-time and a UTC accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalendarUnit {
    Date,
    Day,
    FullYear,
    Hours,
    Milliseconds,
    Minutes,
    Month,
    Seconds,
}

impl CalendarUnit {
    pub const ALL: [CalendarUnit; 8] = [
        CalendarUnit::Date,
        CalendarUnit::Day,
        CalendarUnit::FullYear,
        CalendarUnit::Hours,
        CalendarUnit::Milliseconds,
        CalendarUnit::Minutes,
        CalendarUnit::Month,
        CalendarUnit::Seconds,
    ];

    /// `Day` is derived from the date and has no setter on any host.
    pub fn is_writable(self) -> bool {
        self != CalendarUnit::Day
    }
}

/// Direction of a calendar accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessorOp {
    Get,
    Set,
}

/// One row of the UTC redirection table: `local` forwards to `utc` with the
/// same receiver and arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcRedirect {
    pub unit: CalendarUnit,
    pub op: AccessorOp,
    pub local: &'static str,
    pub utc: &'static str,
}

/// Accessor names for a unit/direction pair, `None` where the host has no such accessor.
pub fn accessor_names(unit: CalendarUnit, op: AccessorOp) -> Option<(&'static str, &'static str)> {
    use AccessorOp::*;
    use CalendarUnit::*;

    let names = match (op, unit) {
        (Get, Date) => ("getDate", "getUTCDate"),
        (Get, Day) => ("getDay", "getUTCDay"),
        (Get, FullYear) => ("getFullYear", "getUTCFullYear"),
        (Get, Hours) => ("getHours", "getUTCHours"),
        (Get, Milliseconds) => ("getMilliseconds", "getUTCMilliseconds"),
        (Get, Minutes) => ("getMinutes", "getUTCMinutes"),
        (Get, Month) => ("getMonth", "getUTCMonth"),
        (Get, Seconds) => ("getSeconds", "getUTCSeconds"),
        (Set, Date) => ("setDate", "setUTCDate"),
        (Set, Day) => return None,
        (Set, FullYear) => ("setFullYear", "setUTCFullYear"),
        (Set, Hours) => ("setHours", "setUTCHours"),
        (Set, Milliseconds) => ("setMilliseconds", "setUTCMilliseconds"),
        (Set, Minutes) => ("setMinutes", "setUTCMinutes"),
        (Set, Month) => ("setMonth", "setUTCMonth"),
        (Set, Seconds) => ("setSeconds", "setUTCSeconds"),
    };
    Some(names)
}

/// Every local-time accessor paired with the UTC accessor it is redirected to.
pub fn utc_redirection_table() -> Vec<UtcRedirect> {
    let mut table = Vec::with_capacity(15);
    for unit in CalendarUnit::ALL {
        for op in [AccessorOp::Set, AccessorOp::Get] {
            if let Some((local, utc)) = accessor_names(unit, op) {
                table.push(UtcRedirect {
                    unit,
                    op,
                    local,
                    utc,
                });
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_multiple_of_bucket() {
        let mut t = 0.0;
        while t < 5000.0 {
            let q = quantize_time(t);
            assert_eq!(q % 100.0, 0.0, "quantize_time({}) = {}", t, q);
            t += 0.37;
        }
    }

    #[test]
    fn test_quantize_idempotent() {
        for i in 0..10_000 {
            let t = i as f64 * 1.7;
            assert_eq!(quantize_time(quantize_time(t)), quantize_time(t));
        }
    }

    #[test]
    fn test_quantize_rounds_to_nearest() {
        assert_eq!(quantize_time(123.0), 100.0);
        assert_eq!(quantize_time(149.9), 100.0);
        assert_eq!(quantize_time(150.0), 200.0);
        assert_eq!(quantize_time(1045.0), 1000.0);
        assert_eq!(quantize_time(0.0), 0.0);
        assert!(quantize_time(-0.0).is_sign_positive());
    }

    #[test]
    fn test_quantize_negative_halves_round_up() {
        assert_eq!(quantize_time(-150.0), -100.0);
        assert_eq!(quantize_time(-151.0), -200.0);
        assert_eq!(quantize_time(-50.0), 0.0);
        assert!(quantize_time(-50.0).is_sign_positive());
        assert_eq!(quantize_time(-249.0), -200.0);
    }

    #[test]
    fn test_table_shape() {
        let table = utc_redirection_table();
        assert_eq!(table.len(), 15);
        assert_eq!(table.iter().filter(|r| r.op == AccessorOp::Get).count(), 8);
        assert!(table.iter().all(|r| r.utc.contains("UTC")));
        assert!(!table.iter().any(|r| r.local == "setDay"));
    }

    #[test]
    fn test_table_names_line_up() {
        for row in utc_redirection_table() {
            let (prefix, rest) = row.local.split_at(3);
            assert_eq!(row.utc, format!("{}UTC{}", prefix, rest));
        }
    }
}
