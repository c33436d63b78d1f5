use crate::recipients::Recipient;
use serde::Serialize;

/// Replaces every literal `{{name}}` with its value.
///
/// The template is scanned once, so text coming from a value is never
/// substituted again. Placeholders without a value are left as written.
/// Values are inserted as-is, without HTML escaping.
pub fn personalize<'a>(content: &str, values: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let values: Vec<(&str, &str)> = values.into_iter().collect();
    let mut personalized = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("{{") {
        personalized.push_str(&rest[..start]);
        rest = &rest[start..];

        let replacement = rest[2..].find("}}").and_then(|end| {
            let name = &rest[2..2 + end];
            values
                .iter()
                .find(|(candidate, _)| *candidate == name)
                .map(|(_, value)| (*value, end + 4))
        });

        match replacement {
            Some((value, consumed)) => {
                personalized.push_str(value);
                rest = &rest[consumed..];
            }
            None => {
                // Not a known placeholder; keep one brace and rescan after it
                personalized.push('{');
                rest = &rest[1..];
            }
        }
    }

    personalized.push_str(rest);
    personalized
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub subject: String,
    pub body: String,
}

pub fn preview(subject: &str, body: &str, recipient: Option<&Recipient>) -> Preview {
    match recipient {
        Some(recipient) => Preview {
            subject: personalize(subject, recipient.placeholder_values()),
            body: personalize(body, recipient.placeholder_values()),
        },
        None => Preview {
            subject: subject.to_string(),
            body: body.to_string(),
        },
    }
}
