pub mod token;

pub use token::{TokenError, issue_token, verify_token};
