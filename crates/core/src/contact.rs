//! Contact identity and the raw birthday field as fetched from the source.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Birthday property exactly as it came off the wire.
///
/// Parameter names are stored upper-cased; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawBirthdayField {
    pub value: String,
    params: BTreeMap<String, Vec<String>>,
}

impl RawBirthdayField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style helper, mostly for tests.
    pub fn with_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.add_param(name, value);
        self
    }

    pub fn add_param(&mut self, name: &str, value: impl Into<String>) {
        self.params
            .entry(name.to_ascii_uppercase())
            .or_default()
            .push(value.into());
    }

    /// First value of a parameter, if any.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_uppercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn params(&self) -> &BTreeMap<String, Vec<String>> {
        &self.params
    }
}

/// Who a birthday belongs to. Only used for display and logging.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    pub uid: Option<String>,
    /// vCard `FN`.
    pub formatted_name: Option<String>,
    /// Given name component of vCard `N`.
    pub given_name: Option<String>,
    /// Family name component of vCard `N`.
    pub family_name: Option<String>,
}

impl Contact {
    /// Short name used in message bodies: given name, else the formatted name.
    pub fn display_name(&self) -> &str {
        non_empty(&self.given_name)
            .or_else(|| non_empty(&self.formatted_name))
            .unwrap_or_default()
    }

    /// Notification title: `"<FN> (Birthday)"`, falling back to given + family name.
    pub fn birthday_title(&self) -> String {
        match non_empty(&self.formatted_name) {
            Some(name) => format!("{name} (Birthday)"),
            None => format!(
                "{} {} (Birthday)",
                non_empty(&self.given_name).unwrap_or_default(),
                non_empty(&self.family_name).unwrap_or_default()
            ),
        }
    }

    /// Whether the contact carries a structured (`N`) name.
    pub fn has_structured_name(&self) -> bool {
        self.given_name.is_some() || self.family_name.is_some()
    }

    pub fn has_any_name(&self) -> bool {
        !self.display_name().is_empty() || non_empty(&self.family_name).is_some()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// One contact as returned by a [`crate::ContactSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub contact: Contact,
    pub birthday: Option<RawBirthdayField>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joe() -> Contact {
        Contact {
            uid: Some("joe-1".into()),
            formatted_name: Some("Joe Bloggs".into()),
            given_name: Some("Joe".into()),
            family_name: Some("Bloggs".into()),
        }
    }

    #[test]
    fn display_name_prefers_given_name() {
        assert_eq!(joe().display_name(), "Joe");

        let fn_only = Contact {
            formatted_name: Some("Dr. Who".into()),
            ..Default::default()
        };
        assert_eq!(fn_only.display_name(), "Dr. Who");
    }

    #[test]
    fn title_prefers_formatted_name() {
        assert_eq!(joe().birthday_title(), "Joe Bloggs (Birthday)");

        let mut no_fn = joe();
        no_fn.formatted_name = Some(String::new());
        assert_eq!(no_fn.birthday_title(), "Joe Bloggs (Birthday)");

        no_fn.family_name = None;
        no_fn.given_name = Some("Joe".into());
        assert_eq!(no_fn.birthday_title(), "Joe  (Birthday)");
    }

    #[test]
    fn params_are_case_insensitive() {
        let field = RawBirthdayField::new("1604-02-15").with_param("x-apple-omit-year", "1604");
        assert_eq!(field.param("X-APPLE-OMIT-YEAR"), Some("1604"));
        assert_eq!(field.param("VALUE"), None);
    }
}
