use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

// The teacher's original constrained names to `^[a-zA-Z0-9_-]+$`; this
// runtime also allows `.`, `:` and `%` (percent-encoded segments are
// accepted literally, never decoded) and rejects names starting with
// `$`, reserved for system generated temp names.
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-_.:%]+$").unwrap());
static PATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9/*._:%-]+$").unwrap());

#[derive(Debug, Error)]
pub struct InvalidName {
    pub name: String,
    pub reason: &'static str,
}

impl fmt::Display for InvalidName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid actor name '{}': {}", self.name, self.reason)
    }
}

#[derive(Debug, Error)]
pub struct InvalidPath {
    pub path: String,
}

impl fmt::Display for InvalidPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid actor path '{}': paths may only contain [A-Za-z0-9/*._:%-]",
            self.path
        )
    }
}

/// Names must be non-empty, not start with `$` (reserved for system
/// generated temp names) and match `[A-Za-z0-9\-_.:%]+`.
pub fn validate_name(name: &str) -> Result<(), InvalidName> {
    if name.is_empty() {
        return Err(InvalidName {
            name: name.to_string(),
            reason: "name must not be empty",
        });
    }

    if name.starts_with('$') {
        return Err(InvalidName {
            name: name.to_string(),
            reason: "names starting with '$' are reserved",
        });
    }

    if !NAME_RE.is_match(name) {
        return Err(InvalidName {
            name: name.to_string(),
            reason: "name contains characters outside [A-Za-z0-9-_.:%]",
        });
    }

    Ok(())
}

pub fn validate_path(path: &str) -> Result<(), InvalidPath> {
    if !PATH_RE.is_match(path) {
        return Err(InvalidPath {
            path: path.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dots_colons_and_percent() {
        assert!(validate_name("worker.1").is_ok());
        assert!(validate_name("a:b").is_ok());
        assert!(validate_name("100%done").is_ok());
    }

    #[test]
    fn rejects_empty_and_dollar_prefixed() {
        assert!(validate_name("").is_err());
        assert!(validate_name("$temp").is_err());
    }

    #[test]
    fn rejects_illegal_characters() {
        assert!(validate_name("has space").is_err());
        assert!(validate_name("has/slash").is_err());
    }
}
