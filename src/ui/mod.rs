pub mod terminal;

pub use terminal::TerminalUI;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UIError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}
