use chrono::NaiveTime;

use crate::domain::payroll::round2;
use crate::model::attendance::AttendanceStatus;

/// Standard working day; anything beyond it counts as overtime.
pub const STANDARD_HOURS: f64 = 8.0;

/// Check-ins after this are marked late.
pub fn late_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap()
}

/// Worked hours from a check-in/check-out pair, minute resolution,
/// rounded to 2 decimals.
pub fn hours_worked(check_in: NaiveTime, check_out: NaiveTime) -> f64 {
    let minutes = (check_out - check_in).num_minutes();
    round2(minutes.max(0) as f64 / 60.0)
}

pub fn overtime_hours(hours: f64) -> f64 {
    round2((hours - STANDARD_HOURS).max(0.0))
}

pub fn status_for_check_in(check_in: NaiveTime) -> AttendanceStatus {
    if check_in > late_cutoff() {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn full_day_is_eight_and_a_half_hours() {
        assert_eq!(hours_worked(t(9, 0), t(17, 30)), 8.5);
        assert_eq!(overtime_hours(8.5), 0.5);
    }

    #[test]
    fn short_day_has_no_overtime() {
        let h = hours_worked(t(10, 0), t(16, 20));
        assert_eq!(h, 6.33);
        assert_eq!(overtime_hours(h), 0.0);
    }

    #[test]
    fn checkout_before_checkin_clamps_to_zero() {
        assert_eq!(hours_worked(t(17, 0), t(9, 0)), 0.0);
    }

    #[test]
    fn late_after_nine_thirty() {
        assert_eq!(status_for_check_in(t(9, 30)), AttendanceStatus::Present);
        assert_eq!(status_for_check_in(t(9, 31)), AttendanceStatus::Late);
        assert_eq!(status_for_check_in(t(8, 55)), AttendanceStatus::Present);
    }
}
