//! WebDAV multistatus response parsing.
//!
//! Namespaces are ignored and elements are matched on their local name,
//! which is enough for the handful of properties CardDAV discovery needs.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::CardDavError;

/// The properties of one `<response>` element that discovery cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavResponse {
    pub href: String,
    /// `addressbook-home-set` hrefs.
    pub home_set: Vec<String>,
    /// Local names of the `resourcetype` children (`collection`, `addressbook`, ...).
    pub resource_types: Vec<String>,
    /// Body of `address-data`, i.e. the vCard text.
    pub address_data: Option<String>,
}

impl DavResponse {
    pub fn is_address_book(&self) -> bool {
        self.resource_types.iter().any(|t| t == "addressbook")
    }
}

pub fn parse_multistatus(body: &str) -> Result<Vec<DavResponse>, CardDavError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<DavResponse> = None;
    let mut responses = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                open_element(&name, &stack, &mut current);
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                open_element(&name, &stack, &mut current);
            }
            Event::End(_) => {
                if stack.pop().as_deref() == Some("response") {
                    if let Some(done) = current.take() {
                        responses.push(done);
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(quick_xml::Error::from)?;
                add_text(&text, &stack, &mut current);
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                add_text(&String::from_utf8_lossy(&raw), &stack, &mut current);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(responses)
}

fn open_element(name: &str, stack: &[String], current: &mut Option<DavResponse>) {
    if name == "response" {
        *current = Some(DavResponse::default());
        return;
    }
    let Some(response) = current.as_mut() else {
        return;
    };
    if stack.last().map(String::as_str) == Some("resourcetype") {
        response.resource_types.push(name.to_string());
    }
    if name == "address-data" {
        response.address_data.get_or_insert_with(String::new);
    }
}

fn add_text(text: &str, stack: &[String], current: &mut Option<DavResponse>) {
    let Some(response) = current.as_mut() else {
        return;
    };
    let inside = |element: &str| stack.iter().any(|s| s == element);

    match stack.last().map(String::as_str) {
        Some("href") if inside("addressbook-home-set") => {
            response.home_set.push(text.trim().to_string());
        }
        Some("href") if stack.len() >= 2 && stack[stack.len() - 2] == "response" => {
            response.href = text.trim().to_string();
        }
        _ if inside("address-data") => {
            response
                .address_data
                .get_or_insert_with(String::new)
                .push_str(text);
        }
        _ => {}
    }
}
