use serde_json::{Map, Value, json};

const INPUT_FIELDS: [(&str, &str); 4] = [
    ("subject", "The subject line of the email."),
    ("body", "The body of the email."),
    (
        "campaignGoal",
        "The goal of the email campaign (e.g., increase sales, promote a product).",
    ),
    (
        "targetAudience",
        "Description of the target audience for the email campaign.",
    ),
];

const OUTPUT_FIELDS: [(&str, &str); 3] = [
    ("optimizedSubject", "The optimized subject line suggestion."),
    ("optimizedBody", "The optimized body suggestion."),
    (
        "explanation",
        "Explanation of the changes and why they were suggested.",
    ),
];

fn object_schema(fields: &[(&str, &str)]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({ "type": "string", "description": description }),
            )
        })
        .collect();
    let required: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

pub fn input_schema() -> Value {
    object_schema(&INPUT_FIELDS)
}

pub fn output_schema() -> Value {
    object_schema(&OUTPUT_FIELDS)
}

/// Returns the first field listed under `required` that is absent or not a
/// string in `value`. With `allow_empty == false` empty strings (after
/// trimming) count as absent.
pub fn first_missing_field(schema: &Value, value: &Value, allow_empty: bool) -> Option<String> {
    let required = schema.get("required")?.as_array()?;

    required
        .iter()
        .filter_map(Value::as_str)
        .find(|field| match value.get(*field).and_then(Value::as_str) {
            Some(text) => !allow_empty && text.trim().is_empty(),
            None => true,
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_schema_requires_all_fields() {
        let schema = input_schema();
        assert_eq!(
            schema["required"],
            json!(["subject", "body", "campaignGoal", "targetAudience"])
        );
        assert_eq!(schema["properties"]["campaignGoal"]["type"], "string");
    }

    #[test]
    fn test_output_schema_requires_all_fields() {
        let schema = output_schema();
        assert_eq!(
            schema["required"],
            json!(["optimizedSubject", "optimizedBody", "explanation"])
        );
    }

    #[test]
    fn test_first_missing_field() {
        let schema = output_schema();
        let complete = json!({"optimizedSubject": "s", "optimizedBody": "b", "explanation": ""});
        assert_eq!(first_missing_field(&schema, &complete, true), None);
        assert_eq!(
            first_missing_field(&schema, &complete, false),
            Some("explanation".to_string())
        );

        let wrong_type = json!({"optimizedSubject": 1, "optimizedBody": "b", "explanation": "e"});
        assert_eq!(
            first_missing_field(&schema, &wrong_type, true),
            Some("optimizedSubject".to_string())
        );
    }
}
