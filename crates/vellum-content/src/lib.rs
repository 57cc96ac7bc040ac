//! Declarative content model for remotely rendered messages.
//!
//! These types describe what a message looks like on the remote surface:
//! an optional text body, a list of rich embeds, and rows of interactive
//! components. They carry no behavior; the `vellum` runtime binds handlers
//! to components before turning a frame into [`MessageContent`].

mod component;
mod embed;
mod message;

pub use component::{ActionRow, ButtonStyle, Component, ComponentKind, SelectOption};
pub use embed::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia};
pub use message::MessageContent;
