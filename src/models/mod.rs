pub mod admin;
pub mod answer;
pub mod assignment;
pub mod batch;
pub mod candidate;
pub mod exam_session;
pub mod question;
