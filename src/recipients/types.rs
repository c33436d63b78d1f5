use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A contact with a required email and ordered personalization fields.
///
/// Serialized as a flat object: `{"id": .., "email": .., "firstName": ..}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipient {
    pub id: String,
    pub email: String,
    pub fields: Vec<(String, String)>,
}

impl Recipient {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Sets a personalization field, replacing an existing value in place.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing_value)) => *existing_value = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every key of the record, in serialization order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        ["id", "email"]
            .into_iter()
            .chain(self.fields.iter().map(|(name, _)| name.as_str()))
    }

    /// Name/value pairs available to `{{placeholder}}` substitution.
    pub fn placeholder_values(&self) -> impl Iterator<Item = (&str, &str)> {
        [("id", self.id.as_str()), ("email", self.email.as_str())]
            .into_iter()
            .chain(
                self.fields
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            )
    }
}

pub(crate) fn is_reserved_field(name: &str) -> bool {
    name.eq_ignore_ascii_case("id") || name.eq_ignore_ascii_case("email")
}

impl Serialize for Recipient {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.fields.len()))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("email", &self.email)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Recipient {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecipientVisitor)
    }
}

struct RecipientVisitor;

impl<'de> Visitor<'de> for RecipientVisitor {
    type Value = Recipient;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a recipient object with 'id' and 'email'")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Recipient, A::Error> {
        let mut id = None;
        let mut email = None;
        let mut fields = Vec::new();

        // Null values are dropped, matching how undefined columns were stored.
        while let Some((key, value)) = access.next_entry::<String, Option<String>>()? {
            match key.as_str() {
                "id" => id = value,
                "email" => email = value,
                _ => {
                    if let Some(value) = value {
                        fields.push((key, value));
                    }
                }
            }
        }

        let id = id.ok_or_else(|| <A::Error as de::Error>::missing_field("id"))?;
        let email = email.ok_or_else(|| <A::Error as de::Error>::missing_field("email"))?;
        if email.trim().is_empty() {
            return Err(<A::Error as de::Error>::invalid_value(
                de::Unexpected::Str(&email),
                &"a non-empty email address",
            ));
        }

        Ok(Recipient { id, email, fields })
    }
}

/// Counts reported after a CSV import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub processed: usize,
    pub added: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_flat_in_field_order() {
        let recipient = Recipient::new("csv-1-0", "ann@example.com")
            .with_field("firstName", "Ann")
            .with_field("companyName", "Acme");

        let json = serde_json::to_string(&recipient).unwrap();
        assert_eq!(
            json,
            r#"{"id":"csv-1-0","email":"ann@example.com","firstName":"Ann","companyName":"Acme"}"#
        );
    }

    #[test]
    fn test_deserializes_stored_layout() {
        let json = r#"{"id":"1","email":"test1@example.com","lastName":"Doe","firstName":"John","age":null}"#;
        let recipient: Recipient = serde_json::from_str(json).unwrap();

        assert_eq!(recipient.id, "1");
        assert_eq!(recipient.email, "test1@example.com");
        assert_eq!(
            recipient.fields,
            vec![
                ("lastName".to_string(), "Doe".to_string()),
                ("firstName".to_string(), "John".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_email_is_rejected() {
        let result = serde_json::from_str::<Recipient>(r#"{"id":"1","firstName":"John"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_email_is_rejected() {
        let result = serde_json::from_str::<Recipient>(r#"{"id":"1","email":""}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("non-empty email"));

        assert!(serde_json::from_str::<Recipient>(r#"{"id":"1","email":"  "}"#).is_err());
    }

    #[test]
    fn test_set_field_replaces_existing() {
        let mut recipient = Recipient::new("1", "a@x.com").with_field("firstName", "Ann");
        recipient.set_field("firstName", "Anne");

        assert_eq!(recipient.field("firstName"), Some("Anne"));
        assert_eq!(recipient.fields.len(), 1);
    }

    #[test]
    fn test_placeholder_values_include_id_and_email() {
        let recipient = Recipient::new("r1", "a@x.com").with_field("firstName", "Ann");
        let values: Vec<_> = recipient.placeholder_values().collect();

        assert_eq!(
            values,
            vec![("id", "r1"), ("email", "a@x.com"), ("firstName", "Ann")]
        );
    }
}
