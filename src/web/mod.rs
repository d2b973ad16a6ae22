// Web front end - form page, download submission and artifact serving

pub mod errors;
pub mod handlers;
pub mod page;
pub mod router;

pub use router::{build_router, AppState};
