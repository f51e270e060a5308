// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, MemberRepository, PartnerGroupRepository},
    models::auth::{
        AdminLoginPayload, AuthResponse, Claims, GroupLoginPayload, Principal, SessionRole,
    },
    models::member::{Member, MemberRole},
};

/// Gera o hash fora do executor assíncrono.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

/// Confere se o membro apontado pelo token ainda corresponde à sessão.
pub fn principal_for_member(claims: &Claims, member: &Member) -> Result<Principal, AppError> {
    match claims.role {
        SessionRole::Admin => {
            // um papel de admin sem aprovação não basta
            if !member.is_global_admin() || !member.is_approved() {
                return Err(AppError::Forbidden);
            }
            Ok(Principal::GlobalAdmin {
                member_id: member.id,
                acting_group: claims.acting,
            })
        }
        SessionRole::Member => {
            let group = member.partner_group_id.ok_or(AppError::Forbidden)?;
            if member.role != MemberRole::Member || claims.pg != Some(group) {
                return Err(AppError::Forbidden);
            }
            if !member.is_approved() {
                return Err(AppError::MemberNotApproved);
            }
            Ok(Principal::Member {
                member_id: member.id,
                partner_group_id: group,
            })
        }
        SessionRole::PartnerAdmin => Err(AppError::Forbidden),
    }
}

#[derive(Clone)]
pub struct AuthService {
    member_repo: MemberRepository,
    partner_group_repo: PartnerGroupRepository,
    audit_repo: AuditRepository,
    jwt_secret: String,
    session_ttl: Duration,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        member_repo: MemberRepository,
        partner_group_repo: PartnerGroupRepository,
        audit_repo: AuditRepository,
        jwt_secret: String,
        session_ttl: Duration,
        pool: PgPool,
    ) -> Self {
        Self {
            member_repo,
            partner_group_repo,
            audit_repo,
            jwt_secret,
            session_ttl,
            pool,
        }
    }

    // =========================================================================
    //  LOGIN
    // =========================================================================

    pub async fn login_admin(&self, payload: &AdminLoginPayload) -> Result<AuthResponse, AppError> {
        let member = self
            .member_repo
            .find_global_admin(&self.pool, payload.username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(&payload.password, &member.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        if !member.is_approved() {
            return Err(AppError::MemberNotApproved);
        }

        tracing::info!("Login do administrador global {}", member.id);
        self.issue(SessionRole::Admin, member.id, None, None)
    }

    /// Login com a credencial própria do grupo (não é uma linha de `members`).
    pub async fn login_partner_admin(
        &self,
        payload: &GroupLoginPayload,
    ) -> Result<AuthResponse, AppError> {
        let group = self
            .partner_group_repo
            .find_by_id(payload.partner_group_id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if group.admin_username != payload.username.trim()
            || !verify_password(&payload.password, &group.admin_password_hash).await?
        {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!("Login do administrador do grupo {}", group.id);
        self.issue(SessionRole::PartnerAdmin, group.id, Some(group.id), None)
    }

    pub async fn login_member(&self, payload: &GroupLoginPayload) -> Result<AuthResponse, AppError> {
        let member = self
            .member_repo
            .find_group_member(payload.partner_group_id, payload.username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(&payload.password, &member.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        // senha correta, mas o cadastro ainda espera aprovação
        if !member.is_approved() {
            return Err(AppError::MemberNotApproved);
        }

        self.issue(
            SessionRole::Member,
            member.id,
            Some(payload.partner_group_id),
            None,
        )
    }

    // =========================================================================
    //  SESSÃO
    // =========================================================================

    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    /// Reconstrói o papel efetivo a partir do banco. O token é só uma dica.
    pub async fn resolve_role(&self, claims: &Claims) -> Result<Principal, AppError> {
        let principal = match claims.role {
            SessionRole::PartnerAdmin => {
                if claims.pg != Some(claims.sub) {
                    return Err(AppError::Forbidden);
                }
                self.partner_group_repo
                    .find_by_id(claims.sub)
                    .await?
                    .ok_or(AppError::Forbidden)?;
                Principal::PartnerAdmin {
                    partner_group_id: claims.sub,
                }
            }
            SessionRole::Admin | SessionRole::Member => {
                let member = self
                    .member_repo
                    .find_by_id(claims.sub)
                    .await?
                    .ok_or(AppError::Forbidden)?;
                principal_for_member(claims, &member)?
            }
        };

        // O grupo selecionado pode ter sido excluído depois da emissão do token
        if let Principal::GlobalAdmin {
            acting_group: Some(group),
            ..
        } = &principal
        {
            self.partner_group_repo
                .find_by_id(*group)
                .await?
                .ok_or(AppError::Forbidden)?;
        }

        Ok(principal)
    }

    /// O administrador global passa a operar dentro de um grupo.
    pub async fn select_partner_group(
        &self,
        principal: &Principal,
        partner_group_id: Uuid,
    ) -> Result<AuthResponse, AppError> {
        let Principal::GlobalAdmin { member_id, .. } = principal else {
            return Err(AppError::Forbidden);
        };

        let group = self
            .partner_group_repo
            .find_by_id(partner_group_id)
            .await?
            .ok_or(AppError::NotFound("not_found.partner_group"))?;

        let acting = Principal::GlobalAdmin {
            member_id: *member_id,
            acting_group: Some(group.id),
        };
        let entry = acting
            .audit("partner_group.select")
            .target(group.id)
            .detail(json!({ "name": group.name }));
        self.audit_repo.record(&self.pool, &entry).await?;

        tracing::info!("Administrador {} atuando no grupo {}", member_id, group.id);
        self.issue(SessionRole::Admin, *member_id, None, Some(group.id))
    }

    pub async fn deselect_partner_group(
        &self,
        principal: &Principal,
    ) -> Result<AuthResponse, AppError> {
        let Principal::GlobalAdmin {
            member_id,
            acting_group,
        } = principal
        else {
            return Err(AppError::Forbidden);
        };

        if let Some(group) = acting_group {
            let entry = principal.audit("partner_group.deselect").target(*group);
            self.audit_repo.record(&self.pool, &entry).await?;
        }

        self.issue(SessionRole::Admin, *member_id, None, None)
    }

    fn issue(
        &self,
        role: SessionRole,
        sub: Uuid,
        partner_group_id: Option<Uuid>,
        acting: Option<Uuid>,
    ) -> Result<AuthResponse, AppError> {
        let token = self.create_token(role, sub, partner_group_id, acting)?;
        Ok(AuthResponse {
            token,
            role,
            partner_group_id,
            acting_partner_group_id: acting,
        })
    }

    pub fn create_token(
        &self,
        role: SessionRole,
        sub: Uuid,
        partner_group_id: Option<Uuid>,
        acting: Option<Uuid>,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        let claims = Claims {
            sub,
            role,
            pg: partner_group_id,
            acting,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::now_kst;
    use crate::models::member::{ApprovalStatus, MemberType, SettlementMethod};
    use sqlx::postgres::PgPoolOptions;

    fn member(role: MemberRole, group: Option<Uuid>, status: ApprovalStatus) -> Member {
        Member {
            id: Uuid::new_v4(),
            partner_group_id: group,
            username: "dealer01".into(),
            password_hash: String::new(),
            company_name: "부산모터스".into(),
            representative: "김대표".into(),
            business_number: None,
            phone: None,
            mobile: None,
            email: None,
            address: None,
            memo: None,
            role,
            approval_status: status,
            member_type: MemberType::Corporate,
            privacy_agreement: false,
            settlement_method: SettlementMethod::Point,
            point_balance: 0,
            created_at: now_kst(),
        }
    }

    fn claims(role: SessionRole, sub: Uuid, pg: Option<Uuid>, acting: Option<Uuid>) -> Claims {
        Claims {
            sub,
            role,
            pg,
            acting,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn unapproved_global_admin_is_rejected() {
        let admin = member(MemberRole::Admin, None, ApprovalStatus::Applied);
        let result = principal_for_member(&claims(SessionRole::Admin, admin.id, None, None), &admin);
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[test]
    fn admin_claim_on_a_group_member_is_rejected() {
        let group = Uuid::new_v4();
        let m = member(MemberRole::Member, Some(group), ApprovalStatus::Approved);
        let result = principal_for_member(&claims(SessionRole::Admin, m.id, None, None), &m);
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[test]
    fn acting_group_is_carried_into_the_principal() {
        let group = Uuid::new_v4();
        let admin = member(MemberRole::Admin, None, ApprovalStatus::Approved);
        let principal =
            principal_for_member(&claims(SessionRole::Admin, admin.id, None, Some(group)), &admin)
                .unwrap();
        assert_eq!(
            principal,
            Principal::GlobalAdmin {
                member_id: admin.id,
                acting_group: Some(group)
            }
        );
    }

    #[test]
    fn member_session_must_match_its_group() {
        let group = Uuid::new_v4();
        let m = member(MemberRole::Member, Some(group), ApprovalStatus::Approved);

        let ok = principal_for_member(&claims(SessionRole::Member, m.id, Some(group), None), &m);
        assert!(ok.is_ok());

        let other = Some(Uuid::new_v4());
        let moved = principal_for_member(&claims(SessionRole::Member, m.id, other, None), &m);
        assert!(matches!(moved, Err(AppError::Forbidden)));
    }

    #[test]
    fn member_approval_is_rechecked() {
        let group = Uuid::new_v4();
        let m = member(MemberRole::Member, Some(group), ApprovalStatus::Applied);
        let result = principal_for_member(&claims(SessionRole::Member, m.id, Some(group), None), &m);
        assert!(matches!(result, Err(AppError::MemberNotApproved)));
    }

    #[tokio::test]
    async fn tokens_round_trip_and_reject_tampering() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let service = AuthService::new(
            MemberRepository::new(pool.clone()),
            PartnerGroupRepository::new(pool.clone()),
            AuditRepository::new(pool.clone()),
            "test-secret".into(),
            Duration::hours(1),
            pool,
        );

        let group = Uuid::new_v4();
        let token = service
            .create_token(SessionRole::PartnerAdmin, group, Some(group), None)
            .unwrap();
        let claims = service.decode_token(&token).unwrap();
        assert_eq!(claims.sub, group);
        assert_eq!(claims.role, SessionRole::PartnerAdmin);

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(service.decode_token(&tampered), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn passwords_hash_and_verify() {
        let hashed = hash_password("secret1").await.unwrap();
        assert!(verify_password("secret1", &hashed).await.unwrap());
        assert!(!verify_password("wrong", &hashed).await.unwrap());
    }
}
