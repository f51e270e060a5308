// src/services/lifecycle.rs

//! Ciclo de vida do pedido: 신청 → 조합승인 → 가입 → 종료.
//!
//! Nada aqui roda em segundo plano. O status é recalculado toda vez que um
//! pedido é lido ou listado, e o recálculo pode ser repetido à vontade.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::{
    common::error::AppError,
    common::time::midnight,
    models::application::{ApplicationStatus, InsuranceApplication, LifecycleSnapshot},
};

/// Horas entre a aprovação do grupo e o início automático do seguro.
pub const ACTIVATION_DELAY_HOURS: i64 = 2;

/// Duração da cobertura.
pub const COVERAGE_DAYS: i64 = 30;

pub fn activation_delay() -> Duration {
    Duration::hours(ACTIVATION_DELAY_HOURS)
}

/// Vigência a partir da data desejada: da meia-noite até 30 dias depois.
pub fn coverage_window(desired_start_date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = midnight(desired_start_date);
    (start, start + Duration::days(COVERAGE_DAYS))
}

/// Status que os carimbos de tempo implicam em `now`.
/// O fim da vigência vence qualquer outra condição.
pub fn derive_status(
    approved_at: Option<NaiveDateTime>,
    end_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> ApplicationStatus {
    if end_at.is_some_and(|end| now >= end) {
        return ApplicationStatus::Expired;
    }
    match approved_at {
        Some(approved) if now >= approved + activation_delay() => ApplicationStatus::Active,
        Some(_) => ApplicationStatus::UnionApproved,
        None => ApplicationStatus::Applied,
    }
}

/// Aplica as transições automáticas. Devolve `true` se algo mudou e
/// precisa ser gravado.
pub fn advance(app: &mut InsuranceApplication, now: NaiveDateTime) -> bool {
    let before = LifecycleSnapshot::of(app);

    if let Some(approved) = app.approved_at {
        if now >= approved + activation_delay() && app.start_at.is_none() {
            let (start, end) = coverage_window(app.desired_start_date);
            app.start_at = Some(start);
            app.end_at = Some(end);
        }
    }

    // nunca regride
    let derived = derive_status(app.approved_at, app.end_at, now);
    app.status = app.status.max(derived);

    before != LifecycleSnapshot::of(app)
}

/// Recalcula do zero depois de uma correção administrativa, que pode
/// ter mudado a vigência para trás.
pub fn recompute(app: &mut InsuranceApplication, now: NaiveDateTime) {
    app.status = derive_status(app.approved_at, app.end_at, now);
    advance(app, now);
}

/// Edição e exclusão comuns só valem antes da aprovação.
pub fn ensure_editable(app: &InsuranceApplication) -> Result<(), AppError> {
    if app.is_locked() {
        return Err(AppError::ApplicationLocked);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn application(desired: NaiveDate) -> InsuranceApplication {
        InsuranceApplication {
            id: Uuid::new_v4(),
            partner_group_id: Uuid::new_v4(),
            created_by_member_id: Some(Uuid::new_v4()),
            insured_code: None,
            desired_start_date: desired,
            created_at: at(2024, 2, 28, 9, 0),
            approved_at: None,
            start_at: None,
            end_at: None,
            car_plate: "12가3456".into(),
            vin: None,
            car_name: None,
            car_registered_at: None,
            premium: Decimal::from(9_500),
            memo: None,
            status: ApplicationStatus::Applied,
            policy_document_url: None,
            point_deducted: false,
        }
    }

    #[test]
    fn approval_activates_after_two_hours() {
        let mut app = application(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        app.approved_at = Some(at(2024, 3, 1, 10, 0));
        app.status = ApplicationStatus::UnionApproved;

        assert!(!advance(&mut app, at(2024, 3, 1, 11, 59)));
        assert_eq!(app.status, ApplicationStatus::UnionApproved);
        assert_eq!(app.start_at, None);

        assert!(advance(&mut app, at(2024, 3, 1, 12, 1)));
        assert_eq!(app.status, ApplicationStatus::Active);
        assert_eq!(app.start_at, Some(at(2024, 3, 15, 0, 0)));
        assert_eq!(app.end_at, Some(at(2024, 4, 14, 0, 0)));
    }

    #[test]
    fn activation_happens_exactly_at_the_boundary() {
        let approved = at(2024, 3, 1, 10, 0);
        assert_eq!(
            derive_status(Some(approved), None, at(2024, 3, 1, 12, 0)),
            ApplicationStatus::Active
        );
    }

    #[test]
    fn expiry_overrides_everything() {
        let end = at(2024, 4, 14, 0, 0);
        assert_eq!(derive_status(None, Some(end), end), ApplicationStatus::Expired);
        assert_eq!(
            derive_status(Some(at(2024, 4, 13, 23, 0)), Some(end), at(2024, 5, 1, 0, 0)),
            ApplicationStatus::Expired
        );
    }

    #[test]
    fn advancing_twice_is_a_no_op() {
        let mut app = application(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        app.approved_at = Some(at(2024, 3, 1, 10, 0));
        let now = at(2024, 4, 20, 0, 0);

        assert!(advance(&mut app, now));
        let snapshot = (app.status, app.start_at, app.end_at);
        assert!(!advance(&mut app, now));
        assert_eq!(snapshot, (app.status, app.start_at, app.end_at));
        assert_eq!(app.status, ApplicationStatus::Expired);
    }

    #[test]
    fn status_never_moves_backward() {
        let mut app = application(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        app.status = ApplicationStatus::Active;
        advance(&mut app, at(2024, 3, 1, 0, 0));
        assert_eq!(app.status, ApplicationStatus::Active);
    }

    #[test]
    fn existing_window_is_kept() {
        let mut app = application(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        app.approved_at = Some(at(2024, 3, 1, 10, 0));
        app.start_at = Some(at(2024, 3, 20, 0, 0));
        app.end_at = Some(at(2024, 4, 19, 0, 0));

        advance(&mut app, at(2024, 3, 2, 0, 0));
        assert_eq!(app.start_at, Some(at(2024, 3, 20, 0, 0)));
        assert_eq!(app.status, ApplicationStatus::Active);
    }

    #[test]
    fn recompute_allows_an_override_to_reopen_coverage() {
        let mut app = application(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        app.approved_at = Some(at(2024, 3, 1, 10, 0));
        app.status = ApplicationStatus::Expired;
        app.start_at = Some(at(2024, 3, 15, 0, 0));
        app.end_at = Some(at(2024, 6, 1, 0, 0));

        recompute(&mut app, at(2024, 5, 1, 0, 0));
        assert_eq!(app.status, ApplicationStatus::Active);
    }

    #[test]
    fn approved_applications_are_locked() {
        let mut app = application(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert!(ensure_editable(&app).is_ok());
        app.approved_at = Some(at(2024, 3, 1, 10, 0));
        assert!(matches!(ensure_editable(&app), Err(AppError::ApplicationLocked)));
    }
}
