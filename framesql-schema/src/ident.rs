use std::borrow::Cow;

use sqlparser::keywords::ALL_KEYWORDS;

/// Whether `name` must be double-quoted to be used as an identifier.
///
/// Names that start with a digit, contain anything other than ASCII letters, digits
/// and underscores (`- :,#@` among them), or spell a SQL keyword are quoted.
pub fn needs_quoting(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return true;
    };
    if first.is_ascii_digit() {
        return true;
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return true;
    }
    ALL_KEYWORDS
        .binary_search(&name.to_ascii_uppercase().as_str())
        .is_ok()
}

/// `name` as written in generated SQL: bare when safe, double-quoted otherwise.
pub fn escape_identifier(name: &str) -> Cow<'_, str> {
    if needs_quoting(name) {
        Cow::Owned(quote_identifier(name))
    } else {
        Cow::Borrowed(name)
    }
}

/// `name` in double quotes with embedded quotes doubled.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_stay_bare() {
        assert_eq!(escape_identifier("cpu_usage"), "cpu_usage");
        assert_eq!(escape_identifier("Host2"), "Host2");
    }

    #[test]
    fn reserved_characters_are_quoted() {
        for name in ["a-b", "a b", "a:b", "a,b", "a#b", "a@b"] {
            assert_eq!(escape_identifier(name), format!("\"{name}\""));
        }
    }

    #[test]
    fn leading_digit_and_keywords_are_quoted() {
        assert_eq!(escape_identifier("1st"), "\"1st\"");
        assert_eq!(escape_identifier("select"), "\"select\"");
        assert_eq!(escape_identifier(""), "\"\"");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(escape_identifier("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
