pub mod applications;
pub mod audit;
pub mod auth;
pub mod lookup;
pub mod members;
pub mod partner_groups;
pub mod points;
pub mod settlements;
