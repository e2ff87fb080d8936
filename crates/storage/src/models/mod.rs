pub mod admin;
pub mod exam_result;
pub mod participant;

pub use admin::{Admin, AdminRole, SessionAdmin};
pub use exam_result::ExamResult;
pub use participant::{Participant, ParticipantStatus};
