//! HTTP relay: accepts chat histories and streams completions back as SSE

mod error;
mod handler;
pub mod server;
mod streaming;

pub use error::RelayError;
pub use server::{build_router, run_server, RelayState};
pub use streaming::{escape_chunk, relay_stream, RelayEvent, EMPTY_RESPONSE_MESSAGE};
