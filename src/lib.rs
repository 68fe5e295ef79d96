use std::error::Error as StdError;
use std::fmt;

mod builder;
mod console;
mod document;
mod dom;
mod events;
mod html;
mod query;
mod selector;
mod util;

#[cfg(test)]
mod tests;

pub use builder::{AnchorBuilder, ElementBuilder, ImageBuilder, MediaBuilder};
pub use console::{LogEntry, LogLevel};
pub use document::{Document, Element};
pub use events::{Event, EventCallback};
pub use query::{Queryable, select_all_each, select_each};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidArgument(String),
    HtmlParse(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
        }
    }
}

impl StdError for Error {}
