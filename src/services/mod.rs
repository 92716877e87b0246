pub mod admin_service;
pub mod allocation_service;
pub mod answer_service;
pub mod notification_service;
pub mod question_service;
pub mod result_service;
pub mod roster_service;
pub mod session_service;
