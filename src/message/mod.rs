//! Message-related types (`Msg`).

mod msg;

pub use msg::Msg;
