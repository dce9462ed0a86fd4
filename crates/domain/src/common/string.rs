//! String conversion utilities.

/// Converts a blank (empty or whitespace-only) string to `None`.
///
/// Record fields such as `attack.ability` are stored as `""` by older
/// documents; callers treat those the same as an absent value.
///
/// # Examples
///
/// ```
/// use armory_domain::common::none_if_blank;
///
/// assert_eq!(none_if_blank("str"), Some("str"));
/// assert_eq!(none_if_blank(""), None);
/// assert_eq!(none_if_blank("  "), None);
/// ```
pub fn none_if_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Extension trait for strings providing `into_option` as a method.
///
/// # Examples
///
/// ```
/// use armory_domain::common::StringExt;
///
/// assert_eq!("dex".to_string().into_option(), Some("dex".to_string()));
/// assert_eq!(String::new().into_option(), None);
/// ```
pub trait StringExt {
    /// Converts this string to `None` if blank, otherwise `Some(trimmed)`.
    fn into_option(self) -> Option<String>;
}

impl StringExt for String {
    fn into_option(self) -> Option<String> {
        none_if_blank(&self).map(str::to_string)
    }
}
