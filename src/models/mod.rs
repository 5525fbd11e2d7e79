// Models module - Database entity representations

pub mod admin;
pub mod booking;
pub mod class_schedule;
pub mod notification;
pub mod payment_plan;
pub mod recruitment_lead;
pub mod template;
pub mod todo;
pub mod venue;

pub use admin::Admin;
pub use booking::Booking;
pub use class_schedule::ClassSchedule;
pub use notification::Notification;
pub use payment_plan::PaymentPlan;
pub use recruitment_lead::RecruitmentLead;
pub use template::{CustomTemplate, TemplateCategory};
pub use todo::ToDoItem;
pub use venue::Venue;
