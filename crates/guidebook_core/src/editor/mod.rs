//! Guide body editing.
//!
//! Operations are local and synchronous; nothing here touches the gateway.

pub mod block_editor;
