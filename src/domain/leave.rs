use chrono::{Datelike, NaiveDate};

/// Annual leave entitlement in days, per calendar year.
pub const ANNUAL_ENTITLEMENT: u32 = 21;

/// Inclusive day count of a leave range. `start > end` is rejected at
/// validation, so this never sees an inverted range.
pub fn day_count(start: NaiveDate, end: NaiveDate) -> u32 {
    (end - start).num_days() as u32 + 1
}

/// Two inclusive date ranges overlap when neither ends before the other starts.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// Remaining balance: entitlement minus approved days this year, floored at 0.
pub fn remaining_balance(approved_days: u32) -> u32 {
    ANNUAL_ENTITLEMENT.saturating_sub(approved_days)
}

pub fn same_year(date: NaiveDate, year: i32) -> bool {
    date.year() == year
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn day_count_is_inclusive() {
        assert_eq!(day_count(d("2025-03-10"), d("2025-03-12")), 3);
        assert_eq!(day_count(d("2025-03-10"), d("2025-03-10")), 1);
    }

    #[test]
    fn overlapping_second_request_collides() {
        // approved 2025-03-10..12, new request 2025-03-11..13 must collide
        assert!(ranges_overlap(
            d("2025-03-11"),
            d("2025-03-13"),
            d("2025-03-10"),
            d("2025-03-12"),
        ));
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        assert!(!ranges_overlap(
            d("2025-03-13"),
            d("2025-03-14"),
            d("2025-03-10"),
            d("2025-03-12"),
        ));
    }

    #[test]
    fn shared_boundary_day_overlaps() {
        assert!(ranges_overlap(
            d("2025-03-12"),
            d("2025-03-14"),
            d("2025-03-10"),
            d("2025-03-12"),
        ));
    }

    #[test]
    fn balance_floors_at_zero() {
        assert_eq!(remaining_balance(0), 21);
        assert_eq!(remaining_balance(18), 3);
        assert_eq!(remaining_balance(21), 0);
        assert_eq!(remaining_balance(40), 0);
    }
}
