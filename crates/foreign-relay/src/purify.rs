//! Sanitization of untrusted JSON before it is cached or handed out.

use regex::{Captures, Regex};
use serde_json::Value;

/// Rewrites a JSON document in place.
pub trait Sanitizer: Send + Sync {
    fn purify(&self, value: &mut Value);
}

/// Elements removed together with their content.
const BLOCKED_ELEMENTS: [&str; 5] = ["script", "style", "iframe", "object", "embed"];

/// Strips active HTML from every string in a JSON tree.
///
/// Object keys and non-string scalars are left alone.
#[derive(Debug, Clone)]
pub struct HtmlPurifier {
    elements: Vec<Regex>,
    tag: Regex,
    event_handler: Regex,
    javascript_url: Regex,
}

impl HtmlPurifier {
    pub fn new() -> Result<Self, regex::Error> {
        let mut elements = Vec::with_capacity(BLOCKED_ELEMENTS.len() * 2);
        for name in BLOCKED_ELEMENTS {
            elements.push(Regex::new(&format!(
                r"(?is)<{name}\b[^>]*>.*?</{name}\s*>"
            ))?);
            // Unclosed or self-closing leftovers
            elements.push(Regex::new(&format!(r"(?is)</?{name}\b[^>]*>"))?);
        }

        Ok(Self {
            elements,
            tag: Regex::new(r"(?s)<[a-zA-Z][^>]*>")?,
            event_handler: Regex::new(
                r#"(?i)[\s/]+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#,
            )?,
            javascript_url: Regex::new(r"(?i)javascript\s*:")?,
        })
    }

    /// Purify a single string.
    ///
    /// Passes repeat until nothing changes, since removing one fragment can
    /// join its neighbours into a new tag. Every changing pass shortens the
    /// string.
    pub fn purify_str(&self, input: &str) -> String {
        let mut output = input.to_string();
        loop {
            let next = self.purify_pass(&output);
            if next == output {
                return output;
            }
            output = next;
        }
    }

    fn purify_pass(&self, input: &str) -> String {
        let mut output = input.to_string();
        for element in &self.elements {
            if element.is_match(&output) {
                output = element.replace_all(&output, "").into_owned();
            }
        }

        output = self
            .tag
            .replace_all(&output, |caps: &Captures| {
                self.event_handler.replace_all(&caps[0], "").into_owned()
            })
            .into_owned();

        self.javascript_url
            .replace_all(&output, "blocked:")
            .into_owned()
    }
}

impl Sanitizer for HtmlPurifier {
    fn purify(&self, value: &mut Value) {
        match value {
            Value::String(text) => {
                let purified = self.purify_str(text);
                if purified != *text {
                    *text = purified;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.purify(item);
                }
            }
            Value::Object(fields) => {
                for (_, field) in fields.iter_mut() {
                    self.purify(field);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}
