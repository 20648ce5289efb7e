//! Per-entity sqlx query modules. Row structs mirror the persisted schema;
//! handlers never build SQL themselves.

pub mod menu;
pub mod notification;
pub mod payment;
pub mod school;
pub mod student;
pub mod subscription;
pub mod user;
