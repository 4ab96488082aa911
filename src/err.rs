//! Error interface for this crate.
//!
//! Every error raised while lexing, parsing, or assembling source
//! implements [`Error`], which extends [`std::error::Error`] with an optional help hint.
//!
//! This module also re-exports the concrete error types for convenience.

use std::borrow::Cow;

pub use crate::ast::RegErr;
pub use crate::parse::lex::LexErr;
pub use crate::parse::{ParseErr, ParseErrKind};
pub use crate::asm::LineErr;

/// Unified error interface for all errors in this crate.
pub trait Error: std::error::Error {
    /// A clarifying message to help aid someone in how to fix the message.
    ///
    /// By default, this is `None`.
    fn help(&self) -> Option<Cow<str>> {
        None
    }
}
