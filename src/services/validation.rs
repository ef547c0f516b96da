//! Field-level validation for listing drafts.
//!
//! Validators return a structured error map keyed by field name, so UI
//! layers can attach messages to inputs. [`validate_field`] is a projection
//! of the whole-object validator onto a single field, for validate-as-you-
//! type flows.

use crate::models::CarDraft;
use chrono::{Datelike, Utc};
use std::collections::BTreeMap;
use std::fmt;

pub const MIN_YEAR: i32 = 1900;
const MIN_LOCATION_LEN: usize = 3;
const MIN_COLOR_LEN: usize = 2;
pub const VIN_LEN: usize = 17;

/// Field-name → message map. Empty means the draft is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }

    fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.errors.insert(field.to_string(), message.into());
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Validate a whole draft. All failing fields are reported at once.
pub fn validate_draft(draft: &CarDraft) -> Result<(), ValidationErrors> {
    let errors = collect_errors(draft);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one field of the draft, by name. Unknown field names validate
/// trivially.
pub fn validate_field(draft: &CarDraft, field: &str) -> Result<(), ValidationErrors> {
    let all = collect_errors(draft);
    match all.message_for(field) {
        None => Ok(()),
        Some(message) => {
            let mut errors = ValidationErrors::default();
            errors.insert(field, message);
            Err(errors)
        }
    }
}

/// A VIN is exactly 17 ASCII characters: digits and uppercase letters
/// excluding `I`, `O`, and `Q`.
pub fn is_valid_vin(vin: &str) -> bool {
    vin.len() == VIN_LEN
        && vin
            .chars()
            .all(|c| matches!(c, 'A'..='H' | 'J'..='N' | 'P' | 'R'..='Z' | '0'..='9'))
}

fn collect_errors(draft: &CarDraft) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    if draft.brand.trim().is_empty() {
        errors.insert("brand", "brand must not be empty");
    }
    if draft.model.trim().is_empty() {
        errors.insert("model", "model must not be empty");
    }

    let current_year = Utc::now().year();
    if let Some(year) = draft.year {
        if year < MIN_YEAR || year > current_year {
            errors.insert(
                "year",
                format!("year must be between {MIN_YEAR} and {current_year}"),
            );
        }
    }

    if let Some(price) = draft.price {
        if !price.is_finite() || price < 0.0 {
            errors.insert("price", "price must be a non-negative number");
        }
    }
    if let Some(mileage) = draft.mileage {
        if !mileage.is_finite() || mileage < 0.0 {
            errors.insert("mileage", "mileage must be a non-negative number");
        }
    }

    if let Some(vin) = &draft.vin {
        if !is_valid_vin(vin) {
            errors.insert(
                "vin",
                format!("vin must be {VIN_LEN} characters (digits and uppercase letters, excluding I, O, and Q)"),
            );
        }
    }

    if let Some(location) = &draft.location {
        if location.trim().len() < MIN_LOCATION_LEN {
            errors.insert(
                "location",
                format!("location must be at least {MIN_LOCATION_LEN} characters"),
            );
        }
    }
    if let Some(color) = &draft.color {
        if color.trim().len() < MIN_COLOR_LEN {
            errors.insert(
                "color",
                format!("color must be at least {MIN_COLOR_LEN} characters"),
            );
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> CarDraft {
        CarDraft {
            brand: "Honda".into(),
            model: "Accord".into(),
            year: Some(2003),
            price: Some(4500.0),
            mileage: Some(210_000.0),
            vin: Some("1HGCM82633A004352".into()),
            location: Some("Oslo".into()),
            color: Some("silver".into()),
            ..CarDraft::default()
        }
    }

    #[test]
    fn a_complete_draft_validates() {
        assert!(validate_draft(&valid_draft()).is_ok());
    }

    #[test]
    fn vin_rules_match_the_standard_alphabet() {
        assert!(is_valid_vin("1HGCM82633A004352"));
        // wrong length
        assert!(!is_valid_vin("1HGCM82633A00435"));
        assert!(!is_valid_vin("1HGCM82633A0043521"));
        // excluded letters
        assert!(!is_valid_vin("IHGCM82633A004352"));
        assert!(!is_valid_vin("1HGCM82633A0O4352"));
        assert!(!is_valid_vin("QHGCM82633A004352"));
        // lowercase is not accepted
        assert!(!is_valid_vin("1hgcm82633a004352"));
    }

    #[test]
    fn all_failing_fields_are_reported_together() {
        let draft = CarDraft {
            brand: " ".into(),
            model: String::new(),
            year: Some(1850),
            price: Some(-1.0),
            vin: Some("SHORT".into()),
            ..CarDraft::default()
        };
        let errors = validate_draft(&draft).unwrap_err();
        for field in ["brand", "model", "year", "price", "vin"] {
            assert!(errors.message_for(field).is_some(), "{field} missing");
        }
        assert!(errors.message_for("mileage").is_none());
    }

    #[test]
    fn year_bounds_track_the_current_year() {
        let current = Utc::now().year();
        let mut draft = valid_draft();
        draft.year = Some(current);
        assert!(validate_draft(&draft).is_ok());
        draft.year = Some(current + 1);
        assert!(validate_draft(&draft).is_err());
        draft.year = Some(MIN_YEAR);
        assert!(validate_draft(&draft).is_ok());
    }

    #[test]
    fn single_field_projection_ignores_other_failures() {
        let draft = CarDraft {
            brand: String::new(),
            model: "Civic".into(),
            price: Some(-5.0),
            ..CarDraft::default()
        };
        assert!(validate_field(&draft, "model").is_ok());
        let errors = validate_field(&draft, "price").unwrap_err();
        assert!(errors.message_for("price").is_some());
        assert!(errors.message_for("brand").is_none());
    }

    #[test]
    fn optional_fields_left_unset_do_not_fail() {
        let draft = CarDraft {
            brand: "Fiat".into(),
            model: "Panda".into(),
            ..CarDraft::default()
        };
        assert!(validate_draft(&draft).is_ok());
    }
}
