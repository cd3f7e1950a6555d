mod interrupt_parser;
mod sentinel_splitter;
mod session_controller;
mod session_service;
mod stream_decoder;

pub use interrupt_parser::*;
pub use sentinel_splitter::*;
pub use session_controller::*;
pub use session_service::*;
pub use stream_decoder::*;
