pub mod admin;
pub mod exam_result;
pub mod participant;
pub mod statistics;
