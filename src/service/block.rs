use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// The protocol assumes a 15 second block time.
pub const SECS_PER_BLOCK: i64 = 15;
pub const BLOCKS_PER_YEAR: i64 = 365 * 24 * 60 * 60 / SECS_PER_BLOCK;

/// Block height derived from wall time. Only deltas matter, so the genesis
/// is the unix epoch.
pub fn block_of(t: DateTime<Utc>) -> i64 {
    t.timestamp() / SECS_PER_BLOCK
}

pub fn blocks_per_year() -> Decimal {
    Decimal::from(BLOCKS_PER_YEAR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn blocks_per_year_matches_block_time() {
        assert_eq!(BLOCKS_PER_YEAR, 2_102_400);
    }

    #[test]
    fn block_of_is_monotone() {
        let t0 = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        let t1 = Utc.timestamp_opt(1_600_000_015, 0).unwrap();
        assert_eq!(block_of(t1), block_of(t0) + 1);
    }
}
