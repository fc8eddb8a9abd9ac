//! Minimal element-text extraction from descriptor XML.
//!
//! Descriptors (`pom.xml`, `portlet.xml`, `liferay-hook.xml`) are only
//! read for a handful of values, so elements are addressed by their
//! full path from the document root using local names.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::DeployError;

/// Text of every element whose path from the root equals `path`.
///
/// ```ignore
/// let ids = texts_at(pom, &["project", "artifactId"])?;
/// ```
pub(crate) fn texts_at(xml: &str, path: &[&str]) -> Result<Vec<String>, DeployError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<String> = None;
    let mut found = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = reader.decoder().decode(e.local_name().as_ref())?.into_owned();
                stack.push(name);
                if stack_matches(&stack, path) {
                    current = Some(String::new());
                }
            }
            Event::Empty(e) => {
                let name = reader.decoder().decode(e.local_name().as_ref())?.into_owned();
                stack.push(name);
                if stack_matches(&stack, path) {
                    found.push(String::new());
                }
                stack.pop();
            }
            Event::Text(e) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&reader.decoder().decode(&e)?);
                }
            }
            Event::CData(e) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if let Some(text) = current.as_mut() {
                    let entity = reader.decoder().decode(&e)?;
                    text.push_str(decode_entity(&entity));
                }
            }
            Event::End(_) => {
                if stack_matches(&stack, path)
                    && let Some(text) = current.take()
                {
                    found.push(text.trim().to_owned());
                }
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(found)
}

/// First text at `path`, if any.
pub(crate) fn text_at(xml: &str, path: &[&str]) -> Result<Option<String>, DeployError> {
    Ok(texts_at(xml, path)?.into_iter().next())
}

fn stack_matches(stack: &[String], path: &[&str]) -> bool {
    stack.len() == path.len() && stack.iter().zip(path).all(|(a, b)| a == b)
}

fn decode_entity(entity: &str) -> &str {
    match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => "",
    }
}
