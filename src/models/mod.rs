mod catalog_service;
mod organization;
mod usage;
mod usage_duration;
mod usage_scope;
mod user;

pub use catalog_service::*;
pub use organization::*;
pub use usage::*;
pub use usage_duration::*;
pub use usage_scope::*;
pub use user::*;
