use std::str::FromStr;

use thiserror::Error;

use crate::document::{BlockType, InlineStyle, SelectionRange};

/// A user action against the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditIntent {
    InsertText(String),
    DeleteBackward,
    DeleteForward,
    SplitBlock,
    Select(SelectionRange),
    ToggleBlockType(BlockType),
    ToggleInlineStyle(InlineStyle),
    /// Adjust list depth; `shift` outdents
    Tab { shift: bool },
    /// Named keyboard command such as `bold` or `backspace-word`
    KeyCommand(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentParseError {
    #[error("unknown command `:{0}`")]
    UnknownCommand(String),

    #[error("`:{command}` expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("unknown block type `{0}`")]
    UnknownBlockType(String),

    #[error("unknown inline style `{0}`")]
    UnknownStyle(String),

    #[error("invalid offset `{0}`")]
    InvalidOffset(String),
}

/// Terminal line syntax: plain text inserts itself, `::text` inserts text
/// starting with a colon, and `:command args` maps to the other intents.
impl FromStr for EditIntent {
    type Err = IntentParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        if let Some(literal) = line.strip_prefix("::") {
            return Ok(EditIntent::InsertText(format!(":{literal}")));
        }
        let Some(command) = line.strip_prefix(':') else {
            return Ok(EditIntent::InsertText(line.to_string()));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        match name {
            "enter" => Ok(EditIntent::SplitBlock),
            "bs" => Ok(EditIntent::DeleteBackward),
            "del" => Ok(EditIntent::DeleteForward),
            "tab" => Ok(EditIntent::Tab { shift: false }),
            "untab" => Ok(EditIntent::Tab { shift: true }),
            "block" => {
                let arg = parts.next().ok_or(IntentParseError::MissingArgument {
                    command: "block",
                    expected: "a block type",
                })?;
                BlockType::parse(arg)
                    .map(EditIntent::ToggleBlockType)
                    .ok_or_else(|| IntentParseError::UnknownBlockType(arg.to_string()))
            }
            "style" => {
                let arg = parts.next().ok_or(IntentParseError::MissingArgument {
                    command: "style",
                    expected: "an inline style",
                })?;
                InlineStyle::parse(&arg.to_ascii_uppercase())
                    .map(EditIntent::ToggleInlineStyle)
                    .ok_or_else(|| IntentParseError::UnknownStyle(arg.to_string()))
            }
            "key" => {
                let arg = parts.next().ok_or(IntentParseError::MissingArgument {
                    command: "key",
                    expected: "a key command",
                })?;
                Ok(EditIntent::KeyCommand(arg.to_string()))
            }
            "select" => {
                let missing = IntentParseError::MissingArgument {
                    command: "select",
                    expected: "<key> <offset> [<key> <offset>]",
                };
                let anchor_key = parts.next().ok_or_else(|| missing.clone())?;
                let anchor_offset = parse_offset(parts.next().ok_or_else(|| missing.clone())?)?;
                let selection = match parts.next() {
                    Some(focus_key) => {
                        let focus_offset = parse_offset(parts.next().ok_or(missing)?)?;
                        SelectionRange::new(anchor_key, anchor_offset, focus_key, focus_offset)
                    }
                    None => SelectionRange::collapsed(anchor_key, anchor_offset),
                };
                Ok(EditIntent::Select(selection))
            }
            other => Err(IntentParseError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_offset(raw: &str) -> Result<usize, IntentParseError> {
    raw.parse()
        .map_err(|_| IntentParseError::InvalidOffset(raw.to_string()))
}
