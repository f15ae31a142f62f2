//! Newline-delimited line protocol spoken with the authority process.
//!
//! Client to authority: `Q <id> <command-json>`.
//! Authority to client: `C <control text>` (the handshake uses
//! [`READY_PAYLOAD`]), `R <id> <outcome-json>` and `E <event-json>`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::command::AuthorityCommand;
use super::error::AuthorityError;

pub const READY_PAYLOAD: &str = "authority.ready v1";

const CONTROL_PREFIX: &str = "C ";
const REQUEST_PREFIX: &str = "Q ";
const RESPONSE_PREFIX: &str = "R ";
const EVENT_PREFIX: &str = "E ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOutcome {
    Ok(Value),
    Err(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WireLine {
    Control(String),
    Response { id: u64, outcome: ResponseOutcome },
    /// Response for a known id whose body could not be read.
    BrokenResponse { id: u64, reason: String },
    Event(String),
    Unknown(String),
}

impl WireLine {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Control(payload) if payload.starts_with(READY_PAYLOAD))
    }
}

pub fn parse_wire_line(raw: &str) -> WireLine {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    if let Some(payload) = trimmed.strip_prefix(CONTROL_PREFIX) {
        return WireLine::Control(payload.to_string());
    }
    if let Some(payload) = trimmed.strip_prefix(EVENT_PREFIX) {
        return WireLine::Event(payload.to_string());
    }
    if let Some(rest) = trimmed.strip_prefix(RESPONSE_PREFIX) {
        let Some((id_text, body)) = rest.split_once(' ') else {
            return WireLine::Unknown(trimmed.to_string());
        };
        let Ok(id) = id_text.parse::<u64>() else {
            return WireLine::Unknown(trimmed.to_string());
        };
        return match serde_json::from_str::<ResponseOutcome>(body) {
            Ok(outcome) => WireLine::Response { id, outcome },
            Err(error) => WireLine::BrokenResponse {
                id,
                reason: error.to_string(),
            },
        };
    }
    WireLine::Unknown(trimmed.to_string())
}

pub fn encode_request_line(id: u64, command: &AuthorityCommand) -> Result<String, AuthorityError> {
    let body = serde_json::to_string(command).map_err(|source| AuthorityError::Encode {
        command: command.name(),
        source,
    })?;
    Ok(format!("{REQUEST_PREFIX}{id} {body}"))
}

/// Authority side of [`encode_request_line`].
pub fn parse_request_line(raw: &str) -> Option<(u64, AuthorityCommand)> {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    let (id_text, body) = trimmed.strip_prefix(REQUEST_PREFIX)?.split_once(' ')?;
    let id = id_text.parse::<u64>().ok()?;
    match serde_json::from_str::<AuthorityCommand>(body) {
        Ok(command) => Some((id, command)),
        Err(error) => {
            warn!(id, error = %error, "authority_request_line_undecodable");
            None
        }
    }
}

pub fn encode_response_line(id: u64, outcome: &ResponseOutcome) -> String {
    let body = serde_json::to_string(outcome)
        .unwrap_or_else(|error| format!(r#"{{"err":"unencodable response: {error}"}}"#));
    format!("{RESPONSE_PREFIX}{id} {body}")
}

pub fn encode_event_line(event_json: &str) -> String {
    format!("{EVENT_PREFIX}{event_json}")
}

pub fn ready_line() -> String {
    format!("{CONTROL_PREFIX}{READY_PAYLOAD}")
}

/// Splits complete lines off the front of `buffer`, dropping lines that are
/// not valid UTF-8.
pub(crate) fn drain_complete_lines(buffer: &mut Vec<u8>, out: &mut Vec<String>) {
    while let Some(newline_index) = buffer.iter().position(|byte| *byte == b'\n') {
        let mut line_bytes = buffer.drain(..=newline_index).collect::<Vec<u8>>();
        line_bytes.pop(); // newline
        if line_bytes.last().copied() == Some(b'\r') {
            line_bytes.pop();
        }

        match String::from_utf8(line_bytes) {
            Ok(line) => out.push(line),
            Err(err) => warn!(error = %err, "authority_invalid_utf8_line_dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_wire_line_handles_each_prefix_and_crlf() {
        assert!(parse_wire_line("C authority.ready v1\r\n").is_ready());
        assert_eq!(
            parse_wire_line("E {\"event\":\"StoppedShooting\"}\n"),
            WireLine::Event("{\"event\":\"StoppedShooting\"}".to_string())
        );
        assert_eq!(
            parse_wire_line("R 7 {\"ok\":3}\r\n"),
            WireLine::Response {
                id: 7,
                outcome: ResponseOutcome::Ok(json!(3)),
            }
        );
        assert_eq!(
            parse_wire_line("R 8 {\"err\":\"Invalid game index: 5\"}"),
            WireLine::Response {
                id: 8,
                outcome: ResponseOutcome::Err("Invalid game index: 5".to_string()),
            }
        );
        assert_eq!(
            parse_wire_line("hello"),
            WireLine::Unknown("hello".to_string())
        );
    }

    #[test]
    fn broken_response_body_keeps_request_id() {
        match parse_wire_line("R 12 not-json") {
            WireLine::BrokenResponse { id, .. } => assert_eq!(id, 12),
            other => panic!("unexpected line: {other:?}"),
        }
        assert!(matches!(parse_wire_line("R x {}"), WireLine::Unknown(_)));
    }

    #[test]
    fn request_line_parses_back_on_authority_side() {
        let command = AuthorityCommand::SubmitGameKey {
            game_name: "Siege".into(),
            key: "ABC".into(),
        };
        let line = encode_request_line(41, &command).expect("encode");
        assert!(line.starts_with("Q 41 "));
        assert_eq!(parse_request_line(&line), Some((41, command)));
        assert_eq!(parse_request_line("Q 1 {\"command\":\"launch_rockets\"}"), None);
    }

    #[test]
    fn drain_complete_lines_keeps_partial_tail() {
        let mut buffer = b"R 1 {\"ok\":null}\r\nE {}\nC partial".to_vec();
        let mut out = Vec::new();
        drain_complete_lines(&mut buffer, &mut out);

        assert_eq!(out, vec!["R 1 {\"ok\":null}".to_string(), "E {}".to_string()]);
        assert_eq!(buffer, b"C partial".to_vec());
    }

    #[test]
    fn drain_complete_lines_drops_invalid_utf8() {
        let mut buffer = vec![0xff, 0xfe, b'\n', b'E', b' ', b'{', b'}', b'\n'];
        let mut out = Vec::new();
        drain_complete_lines(&mut buffer, &mut out);
        assert_eq!(out, vec!["E {}".to_string()]);
        assert!(buffer.is_empty());
    }
}
