//! Minijinja template rendering for notification messages.
//!
//! The body template sees two bindings, `contact` and `when` (the birth
//! date, `year` is 1 when unknown), plus these helpers, each usable as a
//! filter or as a function:
//!
//! | helper | result |
//! |---|---|
//! | `is_today(date)` | whether the birthday is today |
//! | `project_next(date)` | next occurrence as `YYYY-MM-DD` |
//! | `age(date)` | age reached on the next occurrence |
//! | `display_name(contact)` | given name, else formatted name |
//! | `format_date(date, fmt="%a, %d %b")` | strftime formatting |
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call. "Today" is taken
//! from the injected [`Clock`] at that point.

use std::fmt::Write;
use std::sync::Arc;

use birthday_core::{parser, projection, BirthDate, Clock, Contact};
use chrono::NaiveDate;
use minijinja::value::Value;
use minijinja::{context, Environment, Error, ErrorKind};

use crate::traits::NotifyError;

/// Body used when the configuration does not set one.
pub const DEFAULT_TEMPLATE: &str = "{{ contact | display_name }} has their birthday \
{% if when | is_today %}today{% else %}on {{ when | project_next | format_date }}{% endif %}.\
{% if when.year > 1 %} They are turning {{ when | age }}.{% endif %}";

const DEFAULT_DATE_FORMAT: &str = "%a, %d %b";

/// Renders notification bodies and titles.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template: String,
    clock: Arc<dyn Clock>,
}

impl TemplateRenderer {
    /// A blank or missing template selects [`DEFAULT_TEMPLATE`].
    pub fn new(template: Option<String>, clock: Arc<dyn Clock>) -> Self {
        let template = template
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
        Self { template, clock }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Build a configured minijinja environment with the birthday helpers.
    fn build_env(today: NaiveDate) -> Environment<'static> {
        let mut env = Environment::new();

        let is_today = move |when: Value| -> Result<bool, Error> {
            Ok(projection::is_today(date_arg(&when)?, today))
        };
        env.add_filter("is_today", is_today);
        env.add_function("is_today", is_today);

        let project_next = move |when: Value| -> Result<String, Error> {
            let next = projection::project_next(date_arg(&when)?, today);
            Ok(next.format("%Y-%m-%d").to_string())
        };
        env.add_filter("project_next", project_next);
        env.add_function("project_next", project_next);

        let age = move |when: Value| -> Result<i32, Error> {
            Ok(projection::age(date_arg(&when)?, today))
        };
        env.add_filter("age", age);
        env.add_function("age", age);

        env.add_filter("display_name", display_name);
        env.add_function("display_name", display_name);
        env.add_filter("format_date", format_date);
        env.add_function("format_date", format_date);

        env
    }

    /// Render the body for `contact`, whose birthday is `when`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or a
    /// helper is used on something that is not a date.
    pub fn render_body(&self, contact: &Contact, when: BirthDate) -> Result<String, NotifyError> {
        let env = Self::build_env(self.clock.today());
        env.render_str(&self.template, context! { contact => contact, when => when })
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// `"<FN> (Birthday)"`, falling back to given and family name.
    pub fn render_title(&self, contact: &Contact) -> String {
        contact.birthday_title()
    }

    /// Check the template at startup.
    ///
    /// Besides parsing, renders once against a sample contact so unknown
    /// helpers and bad date formats are caught before the first pass.
    pub fn validate(&self) -> Result<(), NotifyError> {
        let today = self.clock.today();
        let env = Self::build_env(today);
        env.template_from_str(&self.template)
            .map_err(|e| NotifyError::Template(e.to_string()))?;

        let sample = Contact {
            formatted_name: Some("Joe Bloggs".into()),
            given_name: Some("Joe".into()),
            family_name: Some("Bloggs".into()),
            ..Default::default()
        };
        self.render_body(&sample, BirthDate::from(today))?;
        Ok(())
    }
}

fn invalid(msg: String) -> Error {
    Error::new(ErrorKind::InvalidOperation, msg)
}

/// Accepts a serialized [`BirthDate`] or a date string.
fn date_arg(value: &Value) -> Result<BirthDate, Error> {
    if let Some(text) = value.as_str() {
        return parser::parse_value(text)
            .and_then(|parsed| parsed.birth_date())
            .ok_or_else(|| invalid(format!("cannot interpret {text:?} as a date")));
    }

    let field = |name: &str| -> Result<i64, Error> {
        let v = value.get_attr(name)?;
        if v.is_undefined() || v.is_none() {
            return Err(invalid(format!("expected a date, got {value}")));
        }
        i64::try_from(v)
    };
    let year = field("year")?;
    let month = field("month")?;
    let day = field("day")?;

    let date = i32::try_from(year)
        .ok()
        .zip(u32::try_from(month).ok())
        .zip(u32::try_from(day).ok())
        .and_then(|((y, m), d)| BirthDate::new(y, m, d));
    date.ok_or_else(|| invalid(format!("{year}-{month}-{day} is not a calendar date")))
}

fn display_name(contact: Value) -> String {
    if let Some(name) = contact.as_str() {
        return name.to_string();
    }
    let text = |name: &str| {
        contact
            .get_attr(name)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
    };
    Contact {
        formatted_name: text("formatted_name"),
        given_name: text("given_name"),
        ..Default::default()
    }
    .display_name()
    .to_string()
}

fn format_date(when: Value, fmt: Option<String>) -> Result<String, Error> {
    let date = date_arg(&when)?;
    let day = date
        .on_year(date.year())
        .ok_or_else(|| invalid(format!("{date} is out of range")))?;
    let fmt = fmt.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);

    let mut out = String::new();
    write!(out, "{}", day.format(fmt)).map_err(|_| invalid(format!("invalid date format {fmt:?}")))?;
    Ok(out)
}
