pub mod application_service;
pub mod application_store;
pub mod auth;
pub mod bootstrap;
pub mod lifecycle;
pub mod member_service;
pub mod partner_group_service;
pub mod points_service;
pub mod settlement_service;
pub mod vehicle_registry;
