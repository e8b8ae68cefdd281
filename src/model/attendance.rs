use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, EnumString, AsRefStr, Display, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
    WorkFromHome,
    OnLeave,
    Holiday,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub hours_worked: Option<f64>,
    pub overtime_hours: Option<f64>,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(AttendanceStatus::HalfDay.as_ref(), "half_day");
        assert_eq!(AttendanceStatus::WorkFromHome.as_ref(), "work_from_home");
        assert_eq!(
            AttendanceStatus::from_str("on_leave").unwrap(),
            AttendanceStatus::OnLeave
        );
    }
}
