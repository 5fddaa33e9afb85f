//! Smaller site features that only need the wallet or the store.

pub mod submissions;
pub mod theme;
pub mod token;

pub use submissions::{ContactForm, Submission, SubmissionError, SubmissionQueue};
pub use theme::{Theme, ThemePreference};
pub use token::{add_token_to_wallet, AddTokenOutcome};
