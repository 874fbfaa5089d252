//! Deterministic prompt construction. No network, no randomness, no clock:
//! the same `(operation, locale, input)` always renders the same strings.

mod builder;
mod locale;

pub use builder::{Operation, PromptInput, RenderedPrompt, build};
pub use locale::{Locale, locale_table};
