// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_json::Value;

/// One semantic event scanned out of the generation byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Progress { message: String },
    Done { quest: Value },
    Error { message: String },
}

#[derive(Debug, Deserialize)]
struct StreamLine {
    status: Option<String>,
    message: Option<String>,
    quest: Option<Value>,
    error: Option<String>,
}

/// Incremental scanner over the newline-delimited JSON the generation
/// endpoint streams back.
///
/// Chunk boundaries carry no meaning: raw bytes are buffered until a full
/// line arrives, so both a JSON object and a multi-byte character split
/// across chunks assemble correctly. Lines carrying a `status` field are
/// consumed as stream events; everything else is retained.
///
/// Legacy backends answer with one JSON document (possibly spanning lines,
/// possibly newline-terminated) and no `status` field. The retained lines
/// plus any unterminated tail are parsed as that document at `finish`: an
/// object with an `error` key reads as a failure, anything else as the
/// quest itself.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    buffer: Vec<u8>,
    residue: String,
}

enum LineScan {
    Event(StreamEvent),
    /// A recognized status line with nothing to report.
    Handled,
    /// Not a status line; kept for the legacy fallback.
    Passthrough,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw chunk and collect every event completed by it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let Ok(line) = std::str::from_utf8(&raw[..newline]) else {
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match scan_line(line) {
                LineScan::Event(event) => events.push(event),
                LineScan::Handled => {}
                LineScan::Passthrough => {
                    if !self.residue.is_empty() {
                        self.residue.push('\n');
                    }
                    self.residue.push_str(line);
                }
            }
        }
        events
    }

    /// Drain whatever is left after the stream closes.
    pub fn finish(self) -> Vec<StreamEvent> {
        let Self { buffer, mut residue } = self;

        if let Ok(tail) = std::str::from_utf8(&buffer) {
            let tail = tail.trim();
            if !tail.is_empty() {
                // An unterminated final line may still be a status event.
                if residue.is_empty() {
                    if let LineScan::Event(event) = scan_line(tail) {
                        return vec![event];
                    }
                } else {
                    residue.push('\n');
                }
                residue.push_str(tail);
            }
        }

        if residue.is_empty() {
            return Vec::new();
        }

        // Legacy single-document mode: the whole body is one JSON value.
        match serde_json::from_str::<Value>(&residue) {
            Ok(value) => vec![legacy_event(value)],
            Err(_) => Vec::new(),
        }
    }
}

fn scan_line(line: &str) -> LineScan {
    let Ok(parsed) = serde_json::from_str::<StreamLine>(line) else {
        return LineScan::Passthrough;
    };
    let Some(status) = parsed.status else {
        return LineScan::Passthrough;
    };
    match status.as_str() {
        "progress" => LineScan::Event(StreamEvent::Progress {
            message: parsed.message.unwrap_or_default(),
        }),
        "done" => match parsed.quest {
            Some(quest) => LineScan::Event(StreamEvent::Done { quest }),
            None => LineScan::Handled,
        },
        "error" => LineScan::Event(StreamEvent::Error {
            message: parsed
                .message
                .or(parsed.error)
                .unwrap_or_else(|| "generation failed".to_owned()),
        }),
        _ => LineScan::Handled,
    }
}

fn legacy_event(value: Value) -> StreamEvent {
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return StreamEvent::Error { message: error.to_owned() };
    }
    StreamEvent::Done { quest: value }
}
