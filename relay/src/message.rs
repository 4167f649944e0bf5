use std::fmt;

/// An opaque text payload relayed from a producer to a single consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(String);

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Frames a message for the event stream: `data: <message>\n\n`.
///
/// The payload is written verbatim, matching what consumers of the stream
/// already expect.
pub fn frame(message: &Message) -> String {
    format!("data: {}\n\n", message.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_wraps_payload_in_data_line() {
        assert_eq!(frame(&Message::from("hello")), "data: hello\n\n");
    }

    #[test]
    fn frame_of_empty_message_still_terminates_event() {
        assert_eq!(frame(&Message::from("")), "data: \n\n");
    }

    #[test]
    fn display_shows_raw_text() {
        let message = Message::new(String::from("deploy finished"));
        assert_eq!(message.to_string(), "deploy finished");
        assert_eq!(message.as_str(), "deploy finished");
    }
}
