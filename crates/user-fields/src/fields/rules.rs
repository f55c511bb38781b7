//! Format rules applied to raw field input before encryption.
//!
//! Input is trimmed and matched against an anchored pattern. The match, not the
//! raw input, is what gets encrypted. Digits are spelled `[0-9]` because `\d`
//! in the `regex` crate also matches non-ASCII Unicode digits.

use std::sync::LazyLock;

use regex::Regex;

static PERSONAL_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}(0[1-9]|1[0-2])(0[1-9]|[12][0-9]|3[01])-[0-9]{4}$").unwrap()
});

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 -]{4,18}[0-9]$").unwrap());

/// A validation rule for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRule {
    /// Swedish-style personal identity number, `YYMMDD-XXXX`.
    ///
    /// Days 29 to 31 are accepted for every month; no calendar check is made.
    PersonalId,
    /// Phone number: optional leading `+`, digits, spaces and dashes.
    Phone,
}

impl FormatRule {
    fn regex(self) -> &'static Regex {
        match self {
            FormatRule::PersonalId => &PERSONAL_ID_REGEX,
            FormatRule::Phone => &PHONE_REGEX,
        }
    }

    /// Validate `raw` and return the normalized value to encrypt.
    ///
    /// Returns `None` when the input does not satisfy the rule.
    pub fn normalize<'a>(self, raw: &'a str) -> Option<&'a str> {
        self.regex().find(raw.trim()).map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn personal_id_accepts_valid() {
        assert_eq!(
            FormatRule::PersonalId.normalize("990101-1234"),
            Some("990101-1234")
        );
        assert_eq!(
            FormatRule::PersonalId.normalize("851231-0000"),
            Some("851231-0000")
        );
    }

    #[test]
    fn personal_id_trims_whitespace() {
        assert_eq!(
            FormatRule::PersonalId.normalize("  990101-1234\n"),
            Some("990101-1234")
        );
    }

    #[test]
    fn personal_id_rejects_missing_dash() {
        assert_eq!(FormatRule::PersonalId.normalize("123456789"), None);
        assert_eq!(FormatRule::PersonalId.normalize("9901011234"), None);
    }

    #[test]
    fn personal_id_rejects_bad_month_and_day() {
        assert_eq!(FormatRule::PersonalId.normalize("991301-1234"), None);
        assert_eq!(FormatRule::PersonalId.normalize("990001-1234"), None);
        assert_eq!(FormatRule::PersonalId.normalize("990100-1234"), None);
        assert_eq!(FormatRule::PersonalId.normalize("990132-1234"), None);
    }

    #[test]
    fn personal_id_does_not_check_calendar() {
        assert_eq!(
            FormatRule::PersonalId.normalize("010231-1234"),
            Some("010231-1234")
        );
    }

    #[test]
    fn personal_id_rejects_surrounding_text() {
        assert_eq!(FormatRule::PersonalId.normalize("x990101-1234"), None);
        assert_eq!(FormatRule::PersonalId.normalize("990101-12345"), None);
    }

    #[test]
    fn personal_id_rejects_unicode_digits() {
        // Arabic-Indic digits.
        assert_eq!(
            FormatRule::PersonalId.normalize("٩٩٠١٠١-١٢٣٤"),
            None
        );
    }

    #[test]
    fn phone_accepts_common_forms() {
        assert_eq!(FormatRule::Phone.normalize("0701234567"), Some("0701234567"));
        assert_eq!(
            FormatRule::Phone.normalize("+46 70-123 45 67"),
            Some("+46 70-123 45 67")
        );
    }

    #[test]
    fn phone_rejects_letters_and_short_input() {
        assert_eq!(FormatRule::Phone.normalize("call me"), None);
        assert_eq!(FormatRule::Phone.normalize("123"), None);
        assert_eq!(FormatRule::Phone.normalize("070-"), None);
    }

    #[test]
    fn whitespace_only_is_rejected() {
        assert_eq!(FormatRule::PersonalId.normalize("   "), None);
        assert_eq!(FormatRule::Phone.normalize("   "), None);
    }
}
