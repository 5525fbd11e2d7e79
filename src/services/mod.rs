// Services module - Business logic

pub mod analytics;
pub mod booking;
pub mod password;
pub mod validation;
