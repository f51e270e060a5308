// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

pub const DEFAULT_LANG: &str = "ko";

type Catalog = HashMap<&'static str, &'static str>;

const KO: &[(&str, &str)] = &[
    ("validation.invalid", "입력값을 확인해주세요."),
    ("duplicate.partner_group_name", "이미 존재하는 파트너그룹 이름입니다."),
    ("duplicate.partner_group_admin_username", "이미 사용 중인 관리자 아이디입니다."),
    ("duplicate.business_number", "이미 등록된 사업자번호입니다."),
    ("duplicate.member_username", "이미 사용 중인 아이디입니다."),
    ("duplicate.generic", "중복된 아이디 또는 사업자번호입니다."),
    ("auth.invalid_credentials", "아이디 또는 비밀번호가 올바르지 않습니다."),
    ("auth.member_not_approved", "가입 승인 대기 중입니다. 관리자 승인 후 로그인할 수 있습니다."),
    ("auth.invalid_token", "로그인이 필요합니다."),
    ("auth.forbidden", "접근 권한이 없습니다. 다시 로그인해주세요."),
    ("application.locked", "승인된 신청은 수정하거나 삭제할 수 없습니다."),
    ("not_found.application", "보험 신청을 찾을 수 없습니다."),
    ("not_found.member", "회원을 찾을 수 없습니다."),
    ("not_found.partner_group", "파트너그룹을 찾을 수 없습니다."),
    ("not_found.deposit_request", "입금 요청을 찾을 수 없습니다."),
    ("dependents.partner_group", "소속 회원 또는 신청 내역이 있어 파트너그룹을 삭제할 수 없습니다."),
    ("dependents.member", "보험 신청 또는 포인트 내역이 있어 회원을 삭제할 수 없습니다."),
    ("state.deposit_already_confirmed", "이미 확인된 입금 요청입니다."),
    ("state.bootstrap_already_completed", "초기 관리자 설정이 이미 완료되었습니다."),
    ("state.bootstrap_admin_missing", "초기 설정으로 만든 관리자 계정을 찾을 수 없습니다."),
    ("state.insufficient_points", "포인트 잔액이 부족하여 승인할 수 없습니다."),
    ("input.privacy_agreement_required", "개인 회원은 개인정보 수집 동의가 필요합니다."),
    ("input.desired_start_date_required", "보험 시작 희망일을 입력해주세요."),
    ("input.plate_required", "차량번호를 입력해주세요."),
    ("input.proxy_target_required", "회원 또는 피보험자 코드를 지정해주세요."),
    ("input.invalid_period", "조회 연월이 올바르지 않습니다."),
    ("input.insufficient_points", "포인트 잔액이 부족합니다."),
    ("input.reason_required", "수정 사유를 입력해주세요."),
    ("input.required", "필수 입력 항목입니다."),
    ("input.password_too_short", "비밀번호는 4자 이상이어야 합니다."),
    ("input.amount_positive", "금액은 0보다 커야 합니다."),
    ("lookup.not_found", "차량 정보를 찾을 수 없습니다. 직접 입력해주세요."),
    ("lookup.timeout", "차량 조회 시간이 초과되었습니다. 직접 입력해주세요."),
    ("lookup.upstream_error", "차량 조회 서비스를 사용할 수 없습니다. 직접 입력해주세요."),
    ("internal", "처리 중 오류가 발생했습니다. 잠시 후 다시 시도해주세요."),
];

const EN: &[(&str, &str)] = &[
    ("validation.invalid", "One or more fields are invalid."),
    ("duplicate.partner_group_name", "A partner group with this name already exists."),
    ("duplicate.partner_group_admin_username", "This admin login is already in use."),
    ("duplicate.business_number", "This business registration number is already registered."),
    ("duplicate.member_username", "This login is already in use."),
    ("duplicate.generic", "Duplicate login or business number."),
    ("auth.invalid_credentials", "Invalid login or password."),
    ("auth.member_not_approved", "Your registration is awaiting approval."),
    ("auth.invalid_token", "Please log in."),
    ("auth.forbidden", "You do not have access. Please log in again."),
    ("application.locked", "Approved applications cannot be edited or deleted."),
    ("not_found.application", "Application not found."),
    ("not_found.member", "Member not found."),
    ("not_found.partner_group", "Partner group not found."),
    ("not_found.deposit_request", "Deposit request not found."),
    ("dependents.partner_group", "The partner group still has members or applications."),
    ("dependents.member", "The member still has applications or point records."),
    ("state.deposit_already_confirmed", "This deposit request was already confirmed."),
    ("state.bootstrap_already_completed", "Initial administrator setup was already completed."),
    ("state.bootstrap_admin_missing", "The administrator created at setup no longer exists."),
    ("state.insufficient_points", "The member does not have enough points for this approval."),
    ("input.privacy_agreement_required", "Individual members must accept the privacy agreement."),
    ("input.desired_start_date_required", "The desired start date is required."),
    ("input.plate_required", "The plate number is required."),
    ("input.proxy_target_required", "Choose a member or provide an insured code."),
    ("input.invalid_period", "Invalid year or month."),
    ("input.insufficient_points", "Insufficient point balance."),
    ("input.reason_required", "A reason is required."),
    ("input.required", "This field is required."),
    ("input.password_too_short", "Password must have at least 4 characters."),
    ("input.amount_positive", "Amount must be greater than zero."),
    ("lookup.not_found", "Vehicle not found. Please fill the fields manually."),
    ("lookup.timeout", "Vehicle lookup timed out. Please fill the fields manually."),
    ("lookup.upstream_error", "Vehicle lookup is unavailable. Please fill the fields manually."),
    ("internal", "An unexpected error occurred."),
];

const PT: &[(&str, &str)] = &[
    ("validation.invalid", "Um ou mais campos são inválidos."),
    ("duplicate.partner_group_name", "Já existe um grupo parceiro com esse nome."),
    ("duplicate.partner_group_admin_username", "Este login de administrador já está em uso."),
    ("duplicate.business_number", "Este número de registro já está cadastrado."),
    ("duplicate.member_username", "Este login já está em uso."),
    ("duplicate.generic", "Login ou número de registro duplicado."),
    ("auth.invalid_credentials", "Login ou senha inválidos."),
    ("auth.member_not_approved", "Seu cadastro aguarda aprovação."),
    ("auth.invalid_token", "Faça login para continuar."),
    ("auth.forbidden", "Acesso negado. Faça login novamente."),
    ("application.locked", "Pedidos aprovados não podem ser editados ou excluídos."),
    ("not_found.application", "Pedido não encontrado."),
    ("not_found.member", "Membro não encontrado."),
    ("not_found.partner_group", "Grupo parceiro não encontrado."),
    ("not_found.deposit_request", "Pedido de depósito não encontrado."),
    ("dependents.partner_group", "O grupo ainda possui membros ou pedidos."),
    ("dependents.member", "O membro ainda possui pedidos ou movimentações de pontos."),
    ("state.deposit_already_confirmed", "Este depósito já foi confirmado."),
    ("state.bootstrap_already_completed", "A configuração inicial já foi concluída."),
    ("state.bootstrap_admin_missing", "O administrador criado na configuração inicial não existe mais."),
    ("state.insufficient_points", "O membro não tem pontos suficientes para esta aprovação."),
    ("input.privacy_agreement_required", "Pessoa física precisa aceitar o termo de privacidade."),
    ("input.desired_start_date_required", "A data de início é obrigatória."),
    ("input.plate_required", "A placa é obrigatória."),
    ("input.proxy_target_required", "Informe um membro ou um código de segurado."),
    ("input.invalid_period", "Ano ou mês inválido."),
    ("input.insufficient_points", "Saldo de pontos insuficiente."),
    ("input.reason_required", "Informe o motivo."),
    ("input.required", "Campo obrigatório."),
    ("input.password_too_short", "A senha deve ter no mínimo 4 caracteres."),
    ("input.amount_positive", "O valor deve ser maior que zero."),
    ("lookup.not_found", "Veículo não encontrado. Preencha manualmente."),
    ("lookup.timeout", "A consulta do veículo expirou. Preencha manualmente."),
    ("lookup.upstream_error", "Consulta de veículos indisponível. Preencha manualmente."),
    ("internal", "Ocorreu um erro inesperado."),
];

static CATALOGS: LazyLock<HashMap<&'static str, Catalog>> = LazyLock::new(|| {
    HashMap::from([
        ("ko", KO.iter().copied().collect()),
        ("en", EN.iter().copied().collect()),
        ("pt", PT.iter().copied().collect()),
    ])
});

/// Catálogo de mensagens por idioma. Barato de clonar.
#[derive(Debug, Clone, Copy, Default)]
pub struct I18nStore;

impl I18nStore {
    /// Traduz a chave; cai para o coreano e, por fim, devolve a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        CATALOGS
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| CATALOGS.get(DEFAULT_LANG).and_then(|catalog| catalog.get(key)))
            .map(|text| text.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_language_has_the_same_keys() {
        let ko: Vec<_> = KO.iter().map(|(k, _)| *k).collect();
        for catalog in [EN, PT] {
            let keys: Vec<_> = catalog.iter().map(|(k, _)| *k).collect();
            assert_eq!(ko, keys);
        }
    }

    #[test]
    fn unknown_language_falls_back_to_korean() {
        let store = I18nStore;
        assert_eq!(
            store.translate("fr", "application.locked"),
            store.translate("ko", "application.locked")
        );
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        assert_eq!(I18nStore.translate("en", "no.such.key"), "no.such.key");
    }
}
