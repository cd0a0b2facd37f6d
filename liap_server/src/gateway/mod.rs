//! The session gateway: the websocket boundary between a client connection
//! and a room actor. A split-socket shape (separate read loop and send
//! task) with sequence-numbered push-on-change, client acks, and resync.

mod rate_limiter;
mod registry;
mod websocket;

pub use rate_limiter::RateLimiter;
pub use registry::ConnectionRegistry;
pub use websocket::websocket_handler;
