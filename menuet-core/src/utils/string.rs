//! Case conversion used for module naming and language codes.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static SEPARATOR_BEFORE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9a-z])?[^0-9a-z]+([a-z])").expect("static pattern"));
static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[^0-9a-z]+").expect("static pattern"));
static UPPERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").expect("static pattern"));

/// Camel-case `input`. Strings that already contain an uppercase ASCII
/// letter are returned unchanged; a separator run at the very start is kept.
///
/// ```
/// use menuet_core::utils::string::camel;
///
/// assert_eq!(camel("user/profile-image", false), "userProfileImage");
/// assert_eq!(camel("user/profile", true), "UserProfile");
/// assert_eq!(camel("AlreadyCamel", true), "AlreadyCamel");
/// ```
pub fn camel(input: &str, capitalize: bool) -> String {
    if input.chars().any(|c| c.is_ascii_uppercase()) {
        return input.to_string();
    }

    let lower = input.to_lowercase();
    let mut camelled = SEPARATOR_BEFORE_LETTER
        .replace_all(&lower, |caps: &Captures| {
            let whole = caps.get(0).map(|m| (m.start(), m.as_str())).unwrap_or((0, ""));
            match caps.get(1) {
                None if whole.0 == 0 => whole.1.to_string(),
                lead => format!(
                    "{}{}",
                    lead.map(|m| m.as_str()).unwrap_or(""),
                    caps[2].to_uppercase()
                ),
            }
        })
        .into_owned();

    if capitalize {
        if let Some(first) = camelled.chars().next().filter(char::is_ascii_lowercase) {
            camelled.replace_range(..1, &first.to_ascii_uppercase().to_string());
        }
    }

    camelled
}

/// Snake-case `input` using `separator`.
pub fn snake(input: &str, separator: &str) -> String {
    let separated = NON_ALPHANUMERIC.replace_all(input, separator);
    let lowered = UPPERCASE.replace_all(&separated, |caps: &Captures| {
        format!("{}{}", separator, caps[0].to_lowercase())
    });

    if separator.is_empty() {
        return lowered.into_owned();
    }

    let repeated = Regex::new(&format!("(?:{})+", regex::escape(separator)));
    match repeated {
        Ok(repeated) => repeated.replace_all(&lowered, separator).into_owned(),
        Err(_) => lowered.into_owned(),
    }
}

/// Kebab-case `input`.
pub fn kebab(input: &str) -> String {
    snake(input, "-")
}
