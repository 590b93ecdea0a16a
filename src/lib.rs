//! Chat Tetris (workspace facade crate).
//!
//! Re-exports the workspace crates under one name so the binary, integration
//! tests and benches can reach everything through `chat_tetris::*`.

pub use chat_tetris_adapter as adapter;
pub use chat_tetris_core as core;
pub use chat_tetris_session as session;
pub use chat_tetris_types as types;
