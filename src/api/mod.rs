pub mod dashboard;
pub mod requests;
pub mod users;
