// src/services/settlement_service.rs

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    common::time::month_bounds,
    db::ApplicationRepository,
    models::auth::Principal,
    models::settlement::{SettlementLine, SettlementQuery, SettlementReport, SettlementRow},
    services::application_service::ApplicationService,
};

/// Preço por apólice na visão do administrador global (fora de um grupo).
pub const GLOBAL_UNIT_PRICE: i64 = 95_000;

/// Preço por apólice na visão do grupo parceiro.
pub const PARTNER_UNIT_PRICE: i64 = 9_500;

const UNKNOWN_LABEL: &str = "(알 수 없음)";

/// Quem está sendo cobrado define o multiplicador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementView {
    Global,
    Partner,
}

impl SettlementView {
    pub fn for_principal(principal: &Principal) -> Self {
        match principal {
            Principal::GlobalAdmin {
                acting_group: None, ..
            } => SettlementView::Global,
            _ => SettlementView::Partner,
        }
    }

    pub fn unit_price(self) -> Decimal {
        match self {
            SettlementView::Global => Decimal::from(GLOBAL_UNIT_PRICE),
            SettlementView::Partner => Decimal::from(PARTNER_UNIT_PRICE),
        }
    }
}

type CompanyKey = (String, String, String);

/// Agrupa por empresa criadora as apólices com início em `[start, end)`.
/// Pedidos sem membro criador caem numa linha "desconhecida", sempre por último.
pub fn aggregate(
    rows: &[SettlementRow],
    (start, end): (NaiveDateTime, NaiveDateTime),
    view: SettlementView,
) -> (Vec<SettlementLine>, i64, Decimal) {
    let unit_price = view.unit_price();

    let mut known: BTreeMap<CompanyKey, i64> = BTreeMap::new();
    let mut unknown = 0i64;

    for row in rows.iter().filter(|r| r.start_at >= start && r.start_at < end) {
        match &row.company_name {
            Some(company) => {
                let key = (
                    company.clone(),
                    row.representative.clone().unwrap_or_default(),
                    row.business_number.clone().unwrap_or_default(),
                );
                *known.entry(key).or_default() += 1;
            }
            None => unknown += 1,
        }
    }

    let mut lines: Vec<SettlementLine> = known
        .into_iter()
        .map(|((company_name, representative, business_number), count)| SettlementLine {
            company_name,
            representative,
            business_number,
            unknown: false,
            count,
            amount: unit_price * Decimal::from(count),
        })
        .collect();

    if unknown > 0 {
        lines.push(SettlementLine {
            company_name: UNKNOWN_LABEL.to_string(),
            representative: String::new(),
            business_number: String::new(),
            unknown: true,
            count: unknown,
            amount: unit_price * Decimal::from(unknown),
        });
    }

    let total_count: i64 = lines.iter().map(|l| l.count).sum();
    let total_amount: Decimal = lines.iter().map(|l| l.amount).sum();
    (lines, total_count, total_amount)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Planilha do relatório: UTF-8 com BOM para o Excel abrir o coreano direito.
pub fn to_csv(report: &SettlementReport) -> String {
    let mut out = String::from("\u{feff}");
    out.push_str("업체명,대표자,사업자번호,건수,금액\r\n");

    for line in &report.lines {
        out.push_str(&format!(
            "{},{},{},{},{}\r\n",
            csv_field(&line.company_name),
            csv_field(&line.representative),
            csv_field(&line.business_number),
            line.count,
            line.amount
        ));
    }

    out.push_str(&format!(
        "합계,,,{},{}\r\n",
        report.total_count, report.total_amount
    ));
    out
}

#[derive(Clone)]
pub struct SettlementService {
    repo: ApplicationRepository,
    applications: ApplicationService,
}

impl SettlementService {
    pub fn new(repo: ApplicationRepository, applications: ApplicationService) -> Self {
        Self { repo, applications }
    }

    pub async fn report(
        &self,
        principal: &Principal,
        query: &SettlementQuery,
    ) -> Result<SettlementReport, AppError> {
        if !principal.is_admin_tier() {
            return Err(AppError::Forbidden);
        }
        let bounds = month_bounds(query.year, query.month)
            .ok_or(AppError::InvalidInput("input.invalid_period"))?;

        // dentro de um grupo, o filtro da query é ignorado
        let partner_group_id = principal.partner_scope().or(query.partner_group_id);

        // pedidos aprovados há mais de 2h ainda sem vigência precisam entrar na conta
        self.applications
            .refresh_awaiting_activation(partner_group_id)
            .await?;

        let rows = self
            .repo
            .settlement_rows(partner_group_id, bounds.0, bounds.1)
            .await?;

        let view = SettlementView::for_principal(principal);
        let (lines, total_count, total_amount) = aggregate(&rows, bounds, view);

        Ok(SettlementReport {
            year: query.year,
            month: query.month,
            partner_group_id,
            unit_price: view.unit_price(),
            lines,
            total_count,
            total_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn row(company: Option<&str>, start_at: NaiveDateTime) -> SettlementRow {
        SettlementRow {
            application_id: Uuid::new_v4(),
            partner_group_id: Uuid::new_v4(),
            start_at,
            company_name: company.map(str::to_string),
            representative: company.map(|_| "김대표".to_string()),
            business_number: company.map(|_| "123-45-67890".to_string()),
        }
    }

    #[test]
    fn only_policies_starting_in_the_month_are_billed() {
        let march = month_bounds(2024, 3).unwrap();
        let rows = vec![
            row(Some("부산모터스"), at(2024, 3, 1)),
            row(Some("부산모터스"), at(2024, 3, 31)),
            // aprovado em março, mas a vigência começa em abril
            row(Some("부산모터스"), at(2024, 4, 1)),
            row(Some("부산모터스"), at(2024, 2, 29)),
        ];

        let (lines, count, amount) = aggregate(&rows, march, SettlementView::Partner);
        assert_eq!(lines.len(), 1);
        assert_eq!(count, 2);
        assert_eq!(amount, Decimal::from(19_000));

        let april = month_bounds(2024, 4).unwrap();
        let (_, count, _) = aggregate(&rows, april, SettlementView::Partner);
        assert_eq!(count, 1);
    }

    #[test]
    fn views_use_different_unit_prices() {
        let march = month_bounds(2024, 3).unwrap();
        let rows = vec![row(Some("부산모터스"), at(2024, 3, 10))];

        let (_, _, global) = aggregate(&rows, march, SettlementView::Global);
        let (_, _, partner) = aggregate(&rows, march, SettlementView::Partner);
        assert_eq!(global, Decimal::from(95_000));
        assert_eq!(partner, Decimal::from(9_500));
    }

    #[test]
    fn missing_creator_goes_to_the_unknown_bucket() {
        let march = month_bounds(2024, 3).unwrap();
        let rows = vec![
            row(None, at(2024, 3, 5)),
            row(Some("해운대모터스"), at(2024, 3, 6)),
            row(None, at(2024, 3, 7)),
        ];

        let (lines, count, _) = aggregate(&rows, march, SettlementView::Partner);
        assert_eq!(count, 3);
        let last = lines.last().unwrap();
        assert!(last.unknown);
        assert_eq!(last.count, 2);
    }

    #[test]
    fn empty_month_reports_zero_totals() {
        let (lines, count, amount) =
            aggregate(&[], month_bounds(2024, 3).unwrap(), SettlementView::Partner);
        assert!(lines.is_empty());
        assert_eq!(count, 0);
        assert_eq!(amount, Decimal::ZERO);
    }

    #[test]
    fn global_admin_acting_in_a_group_gets_the_partner_view() {
        let acting = Principal::GlobalAdmin {
            member_id: Uuid::new_v4(),
            acting_group: Some(Uuid::new_v4()),
        };
        assert_eq!(SettlementView::for_principal(&acting), SettlementView::Partner);
    }

    #[test]
    fn csv_has_bom_and_escapes_commas() {
        let report = SettlementReport {
            year: 2024,
            month: 3,
            partner_group_id: None,
            unit_price: Decimal::from(PARTNER_UNIT_PRICE),
            lines: vec![SettlementLine {
                company_name: "부산모터스, 본점".into(),
                representative: "김대표".into(),
                business_number: "123-45-67890".into(),
                unknown: false,
                count: 2,
                amount: Decimal::from(19_000),
            }],
            total_count: 2,
            total_amount: Decimal::from(19_000),
        };

        let csv = to_csv(&report);
        assert!(csv.starts_with('\u{feff}'));
        assert!(csv.contains("\"부산모터스, 본점\",김대표,123-45-67890,2,19000\r\n"));
        assert!(csv.ends_with("합계,,,2,19000\r\n"));
    }
}
