//! Data models for the church administration backend.
//!
//! Entity structs mirror the database rows; request structs carry validated
//! client input. All JSON is camelCase on the wire.

mod category;
mod contribution;
mod dashboard;
mod event;
mod member;
mod user;

pub use category::*;
pub use contribution::*;
pub use dashboard::*;
pub use event::*;
pub use member::*;
pub use user::*;
