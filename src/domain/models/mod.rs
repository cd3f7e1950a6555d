mod action;
mod backend;
mod error;
mod event;
mod interrupt;
mod message;
mod session;
mod slash_commands;
mod story;

pub use action::*;
pub use backend::*;
pub use error::*;
pub use event::*;
pub use interrupt::*;
pub use message::*;
pub use session::*;
pub use slash_commands::*;
pub use story::*;
