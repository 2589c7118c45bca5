#![deny(unsafe_code)]

//! Client-side chat state: nickname lock, live and historical messages,
//! typing status and per-sender colours.
//!
//! Nothing in this crate performs IO. Operations on [`ChatSession`] return
//! [`Command`]s that the host executes against the realtime transport and the
//! history service.

pub mod color;
pub mod command;
pub mod error;
pub mod message;
pub mod render;
pub mod session;
pub mod typing;

pub use color::{Color, ColorAssignment, DEFAULT_PALETTE, OWN_MESSAGE_COLOR, Palette};
pub use command::{Command, OutboundEvent};
pub use error::{SessionError, SessionResult};
pub use message::ChatMessage;
pub use render::{ChatLine, Section};
pub use session::{ChatSession, SessionState};
pub use typing::{TYPING_PLACEHOLDER_USER, TypingStatus};
