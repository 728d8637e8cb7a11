#![forbid(unsafe_code)]

use thiserror::Error;

/// User-input errors, raised before any state changes.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name must be populated")]
    EmptyName,
    #[error("Name already taken")]
    DuplicateName,
    #[error("URL format invalid")]
    InvalidUrl,
    #[error("Parent does not exist")]
    UnknownParent,
    #[error("Item cannot be its own parent")]
    SelfParent,
}

/// HTTP(S) prefix test; not a full URL grammar.
pub fn is_valid_url(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once("://") else {
        return false;
    };
    scheme == "http" || scheme == "https"
}

/// Form-facing check for a new item. Inputs are trimmed first; blank `url`/`parent`
/// mean "not set".
pub fn validate_new_item<S: AsRef<str>>(
    name: &str,
    url: &str,
    parent: &str,
    existing_names: &[S],
) -> Option<ValidationError> {
    let contains = |needle: &str| existing_names.iter().any(|n| n.as_ref() == needle);
    check_fields(name.trim(), url.trim(), parent.trim(), None, contains).err()
}

/// Field checks shared by add and edit. `original_name` is exempt from the
/// duplicate check so an edit may keep its own name.
pub fn check_fields(
    name: &str,
    url: &str,
    parent: &str,
    original_name: Option<&str>,
    name_exists: impl Fn(&str) -> bool,
) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if original_name != Some(name) && name_exists(name) {
        return Err(ValidationError::DuplicateName);
    }
    if !url.is_empty() && !is_valid_url(url) {
        return Err(ValidationError::InvalidUrl);
    }
    if !parent.is_empty() {
        if parent == name || original_name == Some(parent) {
            return Err(ValidationError::SelfParent);
        }
        if !name_exists(parent) {
            return Err(ValidationError::UnknownParent);
        }
    }
    Ok(())
}
