pub mod application;
pub mod audit;
pub mod auth;
pub mod member;
pub mod partner_group;
pub mod points;
pub mod settlement;
pub mod vehicle;
