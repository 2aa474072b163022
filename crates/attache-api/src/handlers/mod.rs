pub mod callback;
pub mod dispatch;
pub mod functions;
pub mod health;
