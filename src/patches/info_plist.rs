//! Info.plist merging through the `plist` crate.
//!
//! A config-file child is written out as a plist fragment, decoded, and
//! stored under the top-level key named by the block's parent.

use super::PatchResult;
use crate::directive::{Directive, Payload};
use crate::xml::Element;
use plist::Value;
use quick_xml::escape::escape;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static EMPTY_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<string>\s*</string>|<string/>").expect("empty string pattern"));

#[derive(Debug, Error)]
pub enum PlistError {
    #[error(transparent)]
    Codec(#[from] plist::Error),
    #[error("top level of the property list is not a dictionary")]
    NotADictionary,
}

pub fn decode(source: &str) -> Result<Value, PlistError> {
    Ok(Value::from_reader_xml(source.as_bytes())?)
}

/// XML form with empty strings spelled `<string></string>`.
pub fn encode(value: &Value) -> Result<String, PlistError> {
    let mut buf = Vec::new();
    value.to_writer_xml(&mut buf)?;
    let xml = String::from_utf8_lossy(&buf);
    let mut out = EMPTY_STRING.replace_all(&xml, "<string></string>").into_owned();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn write_fragment(el: &Element, out: &mut String) {
    let text = el.text().map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    if text.is_none() && el.elements().next().is_none() {
        out.push_str(&format!("<{}/>", el.name));
        return;
    }

    out.push_str(&format!("<{}>", el.name));
    match text {
        Some(text) => out.push_str(&escape(text.as_str())),
        None => {
            for child in el.elements() {
                write_fragment(child, out);
            }
        }
    }
    out.push_str(&format!("</{}>", el.name));
}

/// Decodes `payload` as the value of `key`. Attributes are ignored.
fn fragment_value(key: &str, payload: &Element) -> Result<Option<Value>, PlistError> {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><plist version="1.0"><dict>"#);
    xml.push_str(&format!("<key>{}</key>", escape(key)));
    write_fragment(payload, &mut xml);
    xml.push_str("</dict></plist>");

    let decoded = Value::from_reader_xml(xml.as_bytes())?;
    Ok(decoded
        .into_dictionary()
        .and_then(|mut dict| dict.remove(key)))
}

fn normalize_empty_strings(value: &mut Value) {
    match value {
        Value::String(s) if s.trim().is_empty() => s.clear(),
        Value::Array(items) => items.iter_mut().for_each(normalize_empty_strings),
        Value::Dictionary(dict) => {
            for (_, item) in dict.iter_mut() {
                normalize_empty_strings(item);
            }
        }
        _ => {}
    }
}

pub fn patch(mut plist: Value, directives: &[&Directive]) -> Result<PatchResult<Value>, PlistError> {
    let dict = plist.as_dictionary_mut().ok_or(PlistError::NotADictionary)?;

    let mut modified = false;
    for directive in directives {
        let Payload::Subtree(payload) = &directive.payload else {
            continue;
        };
        let key = directive.parent_path.as_str();
        let Some(value) = fragment_value(key, payload)? else {
            debug!("Nothing decoded for Info.plist key '{}'", key);
            continue;
        };
        if dict.get(key) != Some(&value) {
            debug!("Setting Info.plist key '{}'", key);
            dict.insert(key.to_string(), value);
            modified = true;
        }
    }

    normalize_empty_strings(&mut plist);
    Ok(PatchResult {
        modified,
        document: plist,
    })
}
