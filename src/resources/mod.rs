pub mod api;
pub mod binding;
pub mod iam;
pub mod workflow;

pub use api::*;
pub use binding::*;
pub use iam::*;
pub use workflow::*;
