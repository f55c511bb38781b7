//! Registry of the encrypted user fields.
//!
//! Each [`Field`] carries the names it is known by in the different layers:
//! the storage key, the URL slug, and the results-grid column key.

pub mod rules;

pub use rules::FormatRule;

use thiserror::Error;

/// Errors from the field registry.
#[derive(Debug, Error)]
pub enum FieldError {
    /// No registered field has this slug.
    #[error("unknown field: {0}")]
    UnknownField(String),
}

/// An encrypted attribute attached to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// National personal identification number.
    PersonalId,
    /// Phone number.
    Phone,
}

impl Field {
    /// Every registered field, in results-grid column order.
    pub const ALL: [Field; 2] = [Field::PersonalId, Field::Phone];

    /// Look up a field by its URL slug.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::UnknownField`] if no field has this slug.
    pub fn from_slug(slug: &str) -> Result<Self, FieldError> {
        Self::ALL
            .into_iter()
            .find(|f| f.slug() == slug)
            .ok_or_else(|| FieldError::UnknownField(slug.to_owned()))
    }

    /// URL slug, e.g. `personal-id`.
    pub fn slug(self) -> &'static str {
        match self {
            Field::PersonalId => "personal-id",
            Field::Phone => "phone",
        }
    }

    /// Key under which the ciphertext is stored in the backend.
    pub fn storage_key(self) -> &'static str {
        match self {
            Field::PersonalId => "personnummer",
            Field::Phone => "booked_phone",
        }
    }

    /// Key of the results-grid column.
    pub fn column_key(self) -> &'static str {
        match self {
            Field::PersonalId => "personal-number",
            Field::Phone => "booked-phone",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Field::PersonalId => "Personal ID number",
            Field::Phone => "Phone Number",
        }
    }

    /// Placeholder shown in an empty profile-form input.
    pub fn placeholder(self) -> &'static str {
        match self {
            Field::PersonalId => "YYMMDD-XXXX",
            Field::Phone => "+46 70 123 45 67",
        }
    }

    /// Hint shown next to the profile-form input.
    pub fn hint(self) -> &'static str {
        match self {
            Field::PersonalId => "Your personal ID number is 10 digits.",
            Field::Phone => "Digits, spaces and dashes, optionally starting with +.",
        }
    }

    /// Notice shown below the profile-form input, if any.
    pub fn description(self) -> Option<&'static str> {
        match self {
            Field::PersonalId => Some(
                "By submitting your personal ID number you accept that \
                 Fysikteknologsektionen will save it in an encrypted format. \
                 It will be used to give your relevant access to our premises.",
            ),
            Field::Phone => None,
        }
    }

    /// Validation rule applied before encryption.
    pub fn rule(self) -> FormatRule {
        match self {
            Field::PersonalId => FormatRule::PersonalId,
            Field::Phone => FormatRule::Phone,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}
