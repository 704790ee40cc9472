//! RSS fallback: `<item><title>…</title><link>…</link></item>` pairs from a feed body.

use super::Candidate;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::debug;
use url::Url;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
}

/// Parse RSS 2.0 items. Malformed XML ends the walk and keeps what was read.
pub fn rss_items(body: &str, _base: &Url) -> Vec<Candidate> {
    let mut reader = Reader::from_str(body);
    let mut out = Vec::new();

    let mut in_item = false;
    let mut field: Option<Field> = None;
    let mut title = String::new();
    let mut link = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                "item" => {
                    in_item = true;
                    title.clear();
                    link.clear();
                }
                "title" if in_item => field = Some(Field::Title),
                "link" if in_item => field = Some(Field::Link),
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if let (Some(f), Ok(text)) = (field, e.decode()) {
                    push(f, &text, &mut title, &mut link);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let (Some(f), Ok(text)) = (field, e.decode()) {
                    push(f, &text, &mut title, &mut link);
                }
            }
            Ok(Event::GeneralRef(ref e)) => {
                let Some(f) = field else { continue };
                let resolved = match e.resolve_char_ref() {
                    Ok(Some(ch)) => Some(ch.to_string()),
                    _ => e
                        .decode()
                        .ok()
                        .and_then(|name| resolve_predefined_entity(&name).map(str::to_string)),
                };
                if let Some(text) = resolved {
                    push(f, &text, &mut title, &mut link);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                "item" => {
                    if !title.trim().is_empty() && !link.trim().is_empty() {
                        out.push(Candidate::new(title.trim(), link.trim()));
                    }
                    in_item = false;
                    field = None;
                }
                "title" | "link" => field = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, position = reader.buffer_position(), "Feed parse stopped");
                break;
            }
            _ => {}
        }
    }
    out
}

fn push(field: Field, text: &str, title: &mut String, link: &mut String) {
    match field {
        Field::Title => title.push_str(text),
        Field::Link => link.push_str(text),
    }
}

fn local_name(name: &[u8]) -> &str {
    let name = std::str::from_utf8(name).unwrap_or("");
    name.rsplit(':').next().unwrap_or(name)
}
