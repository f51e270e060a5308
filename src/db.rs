pub mod partner_group_repo;
pub use partner_group_repo::PartnerGroupRepository;
pub mod member_repo;
pub use member_repo::MemberRepository;
pub mod application_repo;
pub use application_repo::ApplicationRepository;
pub mod points_repo;
pub use points_repo::PointsRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod system_repo;
pub use system_repo::{BootstrapState, SystemRepository};
