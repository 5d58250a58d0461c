mod handler;
mod message;

pub use handler::{authorize_handshake, process_message, read_loop, ws_handler, WsQuery};
pub use message::{ClientMessage, ServerMessage};
