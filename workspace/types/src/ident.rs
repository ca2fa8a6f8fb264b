//! Validation of the identifiers flatpak-builder accepts for application IDs
//! and branches. Rejecting them up front gives a clear message instead of a
//! failed privileged build.

use thiserror::Error;

const MAX_APP_ID_LEN: usize = 255;

#[derive(Debug, Error, PartialEq)]
pub enum IdentError {
    #[error("app id '{0}' is empty")]
    EmptyAppId(String),

    #[error("app id '{0}' is longer than 255 characters")]
    AppIdTooLong(String),

    #[error("app id '{0}' must have at least three dot-separated elements")]
    TooFewElements(String),

    #[error("app id '{id}' has an invalid element '{element}'")]
    InvalidElement { id: String, element: String },

    #[error("invalid branch '{0}'")]
    InvalidBranch(String),
}

/// Checks `id` against flatpak's reverse-DNS naming rules.
///
/// Elements are made of ASCII alphanumerics and `_`, must not start with a
/// digit, and only the last element may contain `-`.
pub fn validate_app_id(id: &str) -> Result<(), IdentError> {
    if id.is_empty() {
        return Err(IdentError::EmptyAppId(id.to_string()));
    }
    if id.len() > MAX_APP_ID_LEN {
        return Err(IdentError::AppIdTooLong(id.to_string()));
    }

    let elements: Vec<&str> = id.split('.').collect();
    if elements.len() < 3 {
        return Err(IdentError::TooFewElements(id.to_string()));
    }

    let last = elements.len() - 1;
    for (index, element) in elements.iter().enumerate() {
        if !is_valid_element(element, index == last) {
            return Err(IdentError::InvalidElement {
                id: id.to_string(),
                element: element.to_string(),
            });
        }
    }
    Ok(())
}

fn is_valid_element(element: &str, allow_dash: bool) -> bool {
    let mut chars = element.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if first.is_ascii_digit() {
        return false;
    }
    let valid = |c: char| c.is_ascii_alphanumeric() || c == '_' || (allow_dash && c == '-');
    valid(first) && chars.all(valid)
}

/// Branch names: ASCII alphanumerics, `_`, `-` and `.`, not starting with `.`.
pub fn validate_branch(branch: &str) -> Result<(), IdentError> {
    let mut chars = branch.chars();
    let valid_first = match chars.next() {
        Some(c) => c.is_ascii_alphanumeric() || c == '_' || c == '-',
        None => false,
    };
    if valid_first
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        Ok(())
    } else {
        Err(IdentError::InvalidBranch(branch.to_string()))
    }
}
