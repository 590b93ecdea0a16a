//! Adapter - host surface over TCP with a JSON protocol
//!
//! A chat front-end (the bot process talking to Discord) drives games through
//! this socket: it starts a game for a user, forwards the user's button
//! presses as actions, and renders the observations it gets back.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7878)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Games**: `start`, `command` and `end` address a game by chat user id
//! 4. **Observation Streaming**: Every change to a game started on the
//!    connection is pushed as an `observation`; the end of a game as `game_over`
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: Initial handshake with client info and protocol version
//! - **start**: Start a game for a user, optionally with a seed
//! - **command**: Apply up to 32 actions to a user's game
//! - **end**: Stop a user's game
//! - **stats**: Ask for a user's lifetime stats
//!
//! ## Server → Client
//!
//! - **welcome**: Response to hello
//! - **ack**: Request accepted
//! - **error**: Error response with code and message
//! - **observation**: Full game state (board, active piece, score, ...)
//! - **game_over**: Final score and why the game stopped
//! - **stats**: Response to stats
//!
//! Replies echo the `seq` of the request. Pushed messages (`observation`,
//! `game_over`) carry their own per-connection counter.
//!
//! # Environment Variables
//!
//! - `TETRIS_BOT_HOST`: Bind address (default: "127.0.0.1")
//! - `TETRIS_BOT_PORT`: Port number (default: 7878)
//! - `TETRIS_BOT_MAX_PENDING`: Queued commands per game (default: 16)
//! - `TETRIS_BOT_MAX_SESSIONS`: Live games at once (default: 64)
//! - `TETRIS_BOT_IDLE_SECS`: Seconds without input before a game is abandoned (default: 300)
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":1234567890,"client":{"name":"bot","version":"0.1.0"},"protocol_version":"1.0.0"}
//! Server -> Client: {"type":"welcome","seq":1,"ts":1234567890,"protocol_version":"1.0.0","client_id":1,"game_id":"chat-tetris"}
//! Client -> Server: {"type":"start","seq":2,"ts":1234567891,"user":4242}
//! Server -> Client: {"type":"ack","seq":2,"ts":1234567891,"status":"ok"}
//! Server -> Client: {"type":"observation","seq":1,"ts":1234567891,"user":4242,"board":{...},...}
//! Client -> Server: {"type":"command","seq":3,"ts":1234567892,"user":4242,"actions":["moveLeft","rotate","hardDrop"]}
//! Server -> Client: {"type":"ack","seq":3,"ts":1234567892,"status":"ok"}
//! ```

pub mod protocol;
pub mod server;

pub use chat_tetris_core as core;
pub use chat_tetris_session as session;
pub use chat_tetris_types as types;

pub use protocol::*;
pub use server::{run_server, ClientOutbound, ServerConfig};
