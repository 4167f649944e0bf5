use relay::Message;
use serde::de::Error as _;
use serde::Deserialize;
use serde_json::Value;

const MESSAGE_FIELD: &str = "message";

/// Body of `POST /webhook`: `{"message": "<text>"}`.
///
/// Only the first JSON value in the body is decoded and anything after it is
/// ignored. A `null` body, or a missing or null `message`, decodes as the
/// empty string. The field name is matched case-insensitively, with an exact
/// `message` key taking precedence.
#[derive(Debug, Default)]
pub(crate) struct WebhookParams {
    message: Option<String>,
}

impl WebhookParams {
    pub(crate) fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        let mut deserializer = serde_json::Deserializer::from_slice(body);

        match Option::<Value>::deserialize(&mut deserializer)? {
            None => Ok(Self::default()),
            Some(Value::Object(fields)) => {
                let value = fields.get(MESSAGE_FIELD).or_else(|| {
                    fields
                        .iter()
                        .find(|(key, _)| key.eq_ignore_ascii_case(MESSAGE_FIELD))
                        .map(|(_, value)| value)
                });

                let message = match value {
                    Some(value) => Option::<String>::deserialize(value)?,
                    None => None,
                };
                Ok(Self { message })
            }
            Some(other) => Err(serde_json::Error::custom(format!(
                "invalid type: {}, expected a JSON object",
                json_kind(&other)
            ))),
        }
    }

    pub(crate) fn into_message(self) -> Message {
        Message::from(self.message.unwrap_or_default())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
