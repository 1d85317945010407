// Upstream record classification
//
// Decodes one line of the agent harness's stream-json output into a typed
// record. Anything that does not decode is dropped: partial and non-JSON lines
// are routine on this stream.

use serde::Deserialize;
use serde_json::Value;

/// Longest task description forwarded in a `new_task` event, in characters
pub const MAX_TASK_DESCRIPTION: usize = 100;

/// Description used when a user record carries no text
pub const DEFAULT_TASK_DESCRIPTION: &str = "New task";

/// One recognized upstream record, keyed by its `type` field
///
/// Unknown fields are ignored; unknown `type` values decode to `Other`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UpstreamRecord {
    System {
        #[serde(default)]
        subtype: Option<String>,
    },
    Assistant {
        #[serde(default)]
        message: Option<Message>,
    },
    User {
        #[serde(default)]
        message: Option<Message>,
    },
    Result(ResultRecord),
    #[serde(other)]
    Other,
}

/// Payload of an assistant or user record
#[derive(Debug, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub content: MessageContent,
}

/// `message.content` is either a block list or a bare string
///
/// Blocks stay undecoded until they are read, so one malformed block never
/// takes its siblings down with it.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Blocks(Vec<Value>),
    Text(String),
    #[default]
    Empty,
    Other(Value),
}

/// One content block; blocks that fail to decode are skipped
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    ToolUse {
        name: String,
        #[serde(default)]
        input: Option<Value>,
    },
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Final record of a turn; carries no correlation to a specific tool call
#[derive(Debug, Default, Deserialize)]
pub struct ResultRecord {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub is_error: Option<bool>,
}

/// A tool invocation found in an assistant message
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse {
    pub name: String,
    pub input: Option<Value>,
}

/// Decodes one raw line
///
/// Returns `None` for blank lines, invalid UTF-8 and anything that is not a
/// JSON object with a string `type` field.
pub fn classify(line: &[u8]) -> Option<UpstreamRecord> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_slice(line) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::trace!(error = %err, "discarding undecodable input line");
            None
        }
    }
}

impl UpstreamRecord {
    /// Whether this is the harness's session start record
    pub fn is_init(&self) -> bool {
        matches!(self, UpstreamRecord::System { subtype: Some(subtype) } if subtype == "init")
    }
}

impl Message {
    /// Blocks that decode, in order
    fn blocks(&self) -> impl Iterator<Item = ContentBlock> + '_ {
        let blocks: &[Value] = match &self.content {
            MessageContent::Blocks(blocks) => blocks,
            _ => &[],
        };
        blocks
            .iter()
            .filter_map(|block| ContentBlock::deserialize(block).ok())
    }

    /// Tool invocations in block order
    pub fn tool_uses(&self) -> Vec<ToolUse> {
        self.blocks()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { name, input } => Some(ToolUse { name, input }),
                _ => None,
            })
            .collect()
    }

    /// Plain text of the message: the string content, or its text blocks joined
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(_) => self
                .blocks()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
            MessageContent::Empty | MessageContent::Other(_) => String::new(),
        }
    }
}

/// Builds the description of a user task, capped at [`MAX_TASK_DESCRIPTION`] characters
///
/// A missing message or empty string content gets [`DEFAULT_TASK_DESCRIPTION`].
/// Block content without any text (tool results fed back to the model) is not
/// a task and yields `None`.
pub fn task_description(message: Option<&Message>) -> Option<String> {
    let Some(message) = message else {
        return Some(DEFAULT_TASK_DESCRIPTION.to_string());
    };
    let text = message.text();
    if text.is_empty() {
        return match message.content {
            MessageContent::Blocks(_) | MessageContent::Other(_) => None,
            MessageContent::Text(_) | MessageContent::Empty => {
                Some(DEFAULT_TASK_DESCRIPTION.to_string())
            }
        };
    }
    Some(text.chars().take(MAX_TASK_DESCRIPTION).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_init_is_recognized() {
        let record = classify(br#"{"type":"system","subtype":"init","session_id":"abc"}"#).unwrap();

        assert!(record.is_init());
    }

    #[test]
    fn other_system_records_are_not_init() {
        let record = classify(br#"{"type":"system","subtype":"compact"}"#).unwrap();
        assert!(!record.is_init());

        let record = classify(br#"{"type":"system"}"#).unwrap();
        assert!(!record.is_init());
    }

    #[test]
    fn assistant_tool_use_blocks_are_extracted_in_order() {
        let line = br#"{"type":"assistant","message":{"content":[
            {"type":"text","text":"Let me look."},
            {"type":"tool_use","id":"toolu_1","name":"Read","input":{"file_path":"a.rs"}},
            {"type":"tool_use","name":"Grep"}
        ]}}"#;

        let Some(UpstreamRecord::Assistant { message: Some(message) }) = classify(line) else {
            panic!("Expected assistant record");
        };
        let uses = message.tool_uses();

        assert_eq!(uses.len(), 2);
        assert_eq!(uses[0].name, "Read");
        assert_eq!(uses[0].input, Some(serde_json::json!({"file_path": "a.rs"})));
        assert_eq!(uses[1].name, "Grep");
        assert_eq!(uses[1].input, None);
    }

    #[test]
    fn assistant_with_string_content_has_no_tool_uses() {
        let Some(UpstreamRecord::Assistant { message: Some(message) }) =
            classify(br#"{"type":"assistant","message":{"content":"thinking out loud"}}"#)
        else {
            panic!("Expected assistant record");
        };

        assert!(message.tool_uses().is_empty());
    }

    #[test]
    fn assistant_without_message_still_decodes() {
        assert!(matches!(
            classify(br#"{"type":"assistant"}"#),
            Some(UpstreamRecord::Assistant { message: None })
        ));
    }

    #[test]
    fn result_decodes_with_extra_fields() {
        let record = classify(br#"{"type":"result","subtype":"success","is_error":false,"duration_ms":12}"#);

        match record {
            Some(UpstreamRecord::Result(result)) => {
                assert_eq!(result.subtype.as_deref(), Some("success"));
                assert_eq!(result.is_error, Some(false));
            }
            other => panic!("Expected result record, got {other:?}"),
        }
    }

    #[test]
    fn unknown_types_decode_to_other() {
        assert!(matches!(
            classify(br#"{"type":"stream_event","event":{}}"#),
            Some(UpstreamRecord::Other)
        ));
    }

    #[test]
    fn malformed_lines_are_discarded() {
        let lines: [&[u8]; 8] = [
            b"",
            b"   ",
            b"not json at all",
            br#"{"type":"assistant""#,
            br#"{"subtype":"init"}"#,
            b"[1,2,3]",
            b"42",
            b"{\"type\":\"user\",\"message\":{\"content\":\"\xff\xfe\"}}",
        ];

        for line in lines {
            assert!(classify(line).is_none(), "line {:?}", String::from_utf8_lossy(line));
        }
    }

    #[test]
    fn trailing_carriage_return_is_tolerated() {
        assert!(classify(b"{\"type\":\"result\"}\r").is_some());
    }

    #[test]
    fn malformed_block_does_not_hide_its_siblings() {
        let line = br#"{"type":"assistant","message":{"content":[
            {"type":"text"},
            "stray",
            {"type":"tool_use","input":{}},
            {"type":"tool_use","name":"Read"}
        ]}}"#;

        let Some(UpstreamRecord::Assistant { message: Some(message) }) = classify(line) else {
            panic!("Expected assistant record");
        };
        let uses = message.tool_uses();

        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].name, "Read");
        assert_eq!(message.text(), "");
    }

    #[test]
    fn unexpected_content_shape_still_decodes() {
        let Some(UpstreamRecord::Assistant { message: Some(message) }) =
            classify(br#"{"type":"assistant","message":{"content":{"weird":true}}}"#)
        else {
            panic!("Expected assistant record");
        };

        assert!(message.tool_uses().is_empty());
    }

    #[test]
    fn task_description_truncates_by_characters() {
        let long = "æ".repeat(150);
        let message = Message {
            content: MessageContent::Text(long),
        };

        let description = task_description(Some(&message)).unwrap();

        assert_eq!(description.chars().count(), MAX_TASK_DESCRIPTION);
    }

    #[test]
    fn task_description_joins_text_blocks() {
        let Some(UpstreamRecord::User { message }) = classify(
            br#"{"type":"user","message":{"content":[{"type":"tool_result","content":"ok"},{"type":"text","text":"Now fix"},{"type":"text","text":"the tests"}]}}"#,
        ) else {
            panic!("Expected user record");
        };

        assert_eq!(
            task_description(message.as_ref()).as_deref(),
            Some("Now fix the tests")
        );
    }

    #[test]
    fn task_description_falls_back_when_missing_or_empty() {
        assert_eq!(
            task_description(None).as_deref(),
            Some(DEFAULT_TASK_DESCRIPTION)
        );

        let empty = Message {
            content: MessageContent::Text(String::new()),
        };
        assert_eq!(
            task_description(Some(&empty)).as_deref(),
            Some(DEFAULT_TASK_DESCRIPTION)
        );
    }

    #[test]
    fn tool_results_are_not_tasks() {
        let Some(UpstreamRecord::User { message }) = classify(
            br#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"toolu_1","content":"ok"}]}}"#,
        ) else {
            panic!("Expected user record");
        };

        assert_eq!(task_description(message.as_ref()), None);
    }
}
