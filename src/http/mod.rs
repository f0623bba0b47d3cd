//! HTTP layer: session registry and the axum connection router.

pub mod handlers;
pub mod session;

pub use handlers::{AppState, router};
pub use session::{SessionRecord, SessionRegistry};
