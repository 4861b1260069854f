// Core module - codec, connection state machine, receive loop, session
pub mod codec;
pub mod connection;
pub mod receive;
pub mod session;
