#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod error;
pub mod lro;
pub mod models;
pub mod pager;
pub mod request;
pub mod response;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{ArmError, ArmResult};
pub use lro::{LroStatus, PollOptions, Poller};
pub use pager::{Page, Pager};
