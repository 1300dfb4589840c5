//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): every error the pipeline can surface
//! - [`LoadState`](loadstate::LoadState): per-request pipeline states

pub mod context;
pub mod loadstate;
pub mod neterror;
