//! Minimal vCard decoder.
//!
//! Only what the notifier needs: line unfolding, property groups, parameters
//! (including quoted values and vCard 2.1 bare types) and the text escapes
//! used in `FN` and `N`. Values are kept verbatim otherwise.

use birthday_core::{Contact, ContactRecord, RawBirthdayField};

use crate::error::CardDavError;

/// One content line, e.g. `item1.BDAY;X-APPLE-OMIT-YEAR=1604:1604-02-15`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub group: Option<String>,
    /// Upper-cased property name.
    pub name: String,
    /// Upper-cased parameter names with their values, in source order.
    pub params: Vec<(String, Vec<String>)>,
    pub value: String,
}

/// A decoded `BEGIN:VCARD` .. `END:VCARD` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Card {
    pub properties: Vec<Property>,
}

impl Card {
    /// First property with the given name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn contact(&self) -> Contact {
        let mut contact = Contact {
            uid: self.get("UID").map(|p| p.value.clone()),
            formatted_name: self.get("FN").map(|p| unescape_text(&p.value)),
            ..Default::default()
        };

        if let Some(n) = self.get("N") {
            let mut parts = split_components(&n.value).into_iter();
            contact.family_name = parts.next();
            contact.given_name = parts.next();
        }

        contact
    }

    /// The property as a [`RawBirthdayField`], parameters included.
    pub fn raw_field(&self, name: &str) -> Option<RawBirthdayField> {
        let prop = self.get(name)?;
        let mut field = RawBirthdayField::new(prop.value.trim());
        for (param, values) in &prop.params {
            for value in values {
                field.add_param(param, value.clone());
            }
        }
        Some(field)
    }

    pub fn to_record(&self, field: &str) -> ContactRecord {
        ContactRecord {
            contact: self.contact(),
            birthday: self.raw_field(field),
        }
    }
}

/// Decode every card in `text`.
pub fn decode(text: &str) -> Result<Vec<Card>, CardDavError> {
    let mut cards = Vec::new();
    let mut current: Option<Card> = None;

    for line in unfold(text) {
        let prop = parse_line(&line)?;

        if prop.name == "BEGIN" && prop.value.eq_ignore_ascii_case("VCARD") {
            if current.is_some() {
                return Err(CardDavError::Vcard("nested BEGIN:VCARD".into()));
            }
            current = Some(Card::default());
        } else if prop.name == "END" && prop.value.eq_ignore_ascii_case("VCARD") {
            let card = current
                .take()
                .ok_or_else(|| CardDavError::Vcard("END:VCARD without BEGIN".into()))?;
            cards.push(card);
        } else if let Some(card) = current.as_mut() {
            card.properties.push(prop);
        }
    }

    if current.is_some() {
        return Err(CardDavError::Vcard("unterminated vCard".into()));
    }

    Ok(cards)
}

/// Join folded lines (CRLF followed by a space or tab) and drop blank ones.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        match raw.strip_prefix([' ', '\t']) {
            Some(continuation) if !lines.is_empty() => {
                if let Some(last) = lines.last_mut() {
                    last.push_str(continuation);
                }
            }
            _ => lines.push(raw.to_string()),
        }
    }
    lines.retain(|l| !l.trim().is_empty());
    lines
}

fn parse_line(line: &str) -> Result<Property, CardDavError> {
    let malformed = || CardDavError::Vcard(format!("malformed content line: {line:?}"));

    let name_end = line.find([';', ':']).ok_or_else(malformed)?;
    let (full_name, mut rest) = line.split_at(name_end);

    let (group, name) = match full_name.rsplit_once('.') {
        Some((group, name)) => (Some(group.to_string()), name),
        None => (None, full_name),
    };
    if name.is_empty() {
        return Err(malformed());
    }

    let mut params: Vec<(String, Vec<String>)> = Vec::new();
    while let Some(after) = rest.strip_prefix(';') {
        let (param, remaining) = parse_param(after).ok_or_else(malformed)?;
        params.push(param);
        rest = remaining;
    }

    let value = rest.strip_prefix(':').ok_or_else(malformed)?;

    Ok(Property {
        group,
        name: name.to_ascii_uppercase(),
        params,
        value: value.to_string(),
    })
}

/// Parse one `NAME=v1,"v,2"` parameter, returning it and the unparsed tail
/// (which starts at the next `;` or `:`).
fn parse_param(input: &str) -> Option<((String, Vec<String>), &str)> {
    let name_end = input.find(['=', ';', ':'])?;
    let name = input[..name_end].to_ascii_uppercase();

    if !input[name_end..].starts_with('=') {
        // vCard 2.1 style `TEL;HOME:...`
        return Some((("TYPE".into(), vec![name]), &input[name_end..]));
    }

    let mut values = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for (i, ch) in input[name_end + 1..].char_indices() {
        match ch {
            '"' => quoted = !quoted,
            ',' if !quoted => values.push(std::mem::take(&mut current)),
            ';' | ':' if !quoted => {
                values.push(current);
                return Some(((name, values), &input[name_end + 1 + i..]));
            }
            _ => current.push(ch),
        }
    }

    None
}

/// Split a structured value on unescaped `;`, unescaping each component.
fn split_components(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push('\\');
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ';' => parts.push(unescape_text(&std::mem::take(&mut current))),
            _ => current.push(ch),
        }
    }
    parts.push(unescape_text(&current));
    parts
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
