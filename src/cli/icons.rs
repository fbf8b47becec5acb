//! Console output icons.

use console::{style, StyledObject};

/// Green checkmark.
pub fn success() -> StyledObject<&'static str> {
    style("✓").green()
}

/// Cyan arrow for progress lines.
pub fn info() -> StyledObject<&'static str> {
    style("→").cyan()
}

pub fn warn() -> StyledObject<&'static str> {
    style("!").yellow()
}

/// Red cross.
pub fn error() -> StyledObject<&'static str> {
    style("✗").red()
}

pub fn dim_arrow() -> StyledObject<&'static str> {
    style("→").dim()
}
