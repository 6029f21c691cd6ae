pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, JsonBody};
pub use routes::create_router;
pub use state::AppState;
