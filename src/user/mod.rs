pub mod user_models;
mod viewer;

pub use user_models::User;
pub use viewer::{Viewer, ViewerRole};
