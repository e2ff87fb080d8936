pub mod auth;
pub mod common;
pub mod exam_result;
pub mod participant;
pub mod statistics;
