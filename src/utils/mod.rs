//! Utility modules.

pub mod file;
pub mod retry;
pub mod text;

pub use file::{FileKind, read_file_content, relative_dir, title_from_stem};
pub use retry::{RetryConfig, RetryResult, Retryable, with_retry};
pub use text::{
    MIN_TEXT_LENGTH, has_meaningful_content, prefix_chars, truncate_with_ellipsis,
};
