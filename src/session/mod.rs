//! Client session identity.
//!
//! # Data Flow
//! ```text
//! Cookie: session_id=<token>
//!     → ensure_session (reuse if usable, otherwise generate)
//!     → (SessionId, is_new)
//!     → is_new ? Set-Cookie on the response
//! ```
//!
//! # Design Decisions
//! - Stateless: the token round-trips through the client, nothing is stored
//! - Tokens are UUID v4 (122 random bits), collisions are negligible

pub mod manager;

pub use manager::{ensure_session, set_cookie_header, SessionId, SESSION_COOKIE};
