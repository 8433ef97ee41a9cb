//! URL-safe slugs for catalog entries.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The input has no alphanumeric characters to build a slug from.
    #[error("slug must contain at least one letter or digit")]
    Empty,
}

/// A normalized, URL-safe identifier derived from a display name.
///
/// Normalization lowercases the input, collapses every run of
/// non-alphanumeric characters into a single `-`, and trims separators from
/// both ends.
///
/// ```
/// use marketstall_core::Slug;
///
/// assert_eq!(Slug::normalize("  Cold Brew -- Coffee!! ").unwrap().as_str(), "cold-brew-coffee");
/// assert!(Slug::normalize("!!!").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Separator placed between alphanumeric runs.
    pub const SEPARATOR: char = '-';

    /// Normalize arbitrary text into a slug.
    ///
    /// # Errors
    ///
    /// Returns `SlugError::Empty` if the input contains no alphanumeric characters.
    pub fn normalize(input: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(input.len());
        let mut pending_separator = false;

        for c in input.chars() {
            if c.is_alphanumeric() {
                if pending_separator && !slug.is_empty() {
                    slug.push(Self::SEPARATOR);
                }
                pending_separator = false;
                slug.extend(c.to_lowercase());
            } else {
                pending_separator = true;
            }
        }

        if slug.is_empty() {
            return Err(SlugError::Empty);
        }

        Ok(Self(slug))
    }

    /// Wrap a value read back from storage.
    ///
    /// Stored slugs were normalized on the way in, so no check is repeated.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn slug(s: &str) -> String {
        Slug::normalize(s).unwrap().as_str().to_owned()
    }

    #[test]
    fn test_lowercases() {
        assert_eq!(slug("Espresso"), "espresso");
    }

    #[test]
    fn test_collapses_separator_runs() {
        assert_eq!(slug("French   Press & Kettle"), "french-press-kettle");
        assert_eq!(slug("a--_--b"), "a-b");
    }

    #[test]
    fn test_trims_leading_and_trailing_separators() {
        assert_eq!(slug("  --Mugs!--  "), "mugs");
    }

    #[test]
    fn test_keeps_digits() {
        assert_eq!(slug("V60 Dripper 02"), "v60-dripper-02");
    }

    #[test]
    fn test_keeps_non_ascii_letters() {
        assert_eq!(slug("Crème Brûlée"), "crème-brûlée");
    }

    #[test]
    fn test_rejects_input_without_alphanumerics() {
        assert_eq!(Slug::normalize(""), Err(SlugError::Empty));
        assert_eq!(Slug::normalize("--- !!"), Err(SlugError::Empty));
    }

    #[test]
    fn test_normalizing_a_slug_is_stable() {
        let once = slug("Pour Over Kit");
        assert_eq!(slug(&once), once);
    }
}
