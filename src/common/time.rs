// src/common/time.rs

//! Todas as regras de negócio comparam horários no fuso de Seul (KST, UTC+9,
//! sem horário de verão). Os timestamps são gravados sem fuso e já
//! interpretados como KST.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

pub const KST_OFFSET_HOURS: i64 = 9;

/// "Agora" no relógio civil de Seul.
pub fn now_kst() -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::hours(KST_OFFSET_HOURS)
}

/// Meia-noite (00:00) do dia informado.
pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Intervalo `[primeiro dia do mês, primeiro dia do mês seguinte)`.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((midnight(first), midnight(next)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_bounds_wraps_december() {
        let (start, end) = month_bounds(2024, 12).unwrap();
        assert_eq!(start, midnight(date(2024, 12, 1)));
        assert_eq!(end, midnight(date(2025, 1, 1)));
    }

    #[test]
    fn month_bounds_rejects_invalid_month() {
        assert!(month_bounds(2024, 0).is_none());
        assert!(month_bounds(2024, 13).is_none());
    }

    #[test]
    fn now_is_ahead_of_utc() {
        let utc = Utc::now().naive_utc();
        let kst = now_kst();
        let diff = kst - utc;
        assert!(diff >= Duration::hours(9) - Duration::seconds(5));
        assert!(diff <= Duration::hours(9) + Duration::seconds(5));
    }
}
