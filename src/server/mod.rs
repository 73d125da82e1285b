mod routes;
mod server;
pub mod types;

pub use server::{router, ApiServer};
