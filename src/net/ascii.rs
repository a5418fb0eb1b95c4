//! ASCII control protocol.
//!
//! Many programs talk in character codes: each output below 128 is a
//! character and newline ends a line. Values outside that range are
//! out-of-band signals (a score, a damage report) that belong to no line.
//! Input is sent the same way, one code per character, each line ending in a
//! newline.

use crate::vm::{Engine, EngineError};
use serde::Serialize;

const NEWLINE: i64 = b'\n' as i64;

/// One decoded output value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsciiEvent {
    /// A newline completed this line.
    Line(String),
    /// An out-of-band value.
    Signal(i64),
}

/// Streaming decoder for ASCII output.
#[derive(Debug, Clone, Default)]
pub struct AsciiDecoder {
    line: String,
}

impl AsciiDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one value. Characters other than newline are buffered and
    /// produce no event.
    pub fn push(&mut self, value: i64) -> Option<AsciiEvent> {
        match char_of(value) {
            Some('\n') => Some(AsciiEvent::Line(std::mem::take(&mut self.line))),
            Some(c) => {
                self.line.push(c);
                None
            }
            None => Some(AsciiEvent::Signal(value)),
        }
    }

    /// Characters received since the last newline.
    pub fn partial(&self) -> &str {
        &self.line
    }

    /// Take the unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        (!self.line.is_empty()).then(|| std::mem::take(&mut self.line))
    }
}

/// Everything an ASCII session printed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    /// Completed lines, without their newlines.
    pub lines: Vec<String>,
    /// Text after the last newline.
    pub partial: Option<String>,
    /// Out-of-band values in emission order.
    pub signals: Vec<i64>,
}

impl Transcript {
    /// Decode a complete output sequence.
    pub fn decode<I: IntoIterator<Item = i64>>(values: I) -> Self {
        let mut decoder = AsciiDecoder::new();
        let mut transcript = Transcript::default();
        for value in values {
            transcript.record(decoder.push(value));
        }
        transcript.partial = decoder.finish();
        transcript
    }

    fn record(&mut self, event: Option<AsciiEvent>) {
        match event {
            Some(AsciiEvent::Line(line)) => self.lines.push(line),
            Some(AsciiEvent::Signal(value)) => self.signals.push(value),
            None => {}
        }
    }

    /// The last out-of-band value, usually the answer the program reports.
    pub fn last_signal(&self) -> Option<i64> {
        self.signals.last().copied()
    }

    /// Lines joined back into text.
    pub fn text(&self) -> String {
        let mut text = self.lines.join("\n");
        if !self.lines.is_empty() {
            text.push('\n');
        }
        if let Some(partial) = &self.partial {
            text.push_str(partial);
        }
        text
    }
}

/// Encode a line of text, appending the newline.
pub fn encode_line(line: &str) -> Vec<i64> {
    line.bytes().map(i64::from).chain(std::iter::once(NEWLINE)).collect()
}

fn char_of(value: i64) -> Option<char> {
    u8::try_from(value).ok().filter(u8::is_ascii).map(char::from)
}

/// Drives an engine over the ASCII protocol.
pub struct AsciiSession {
    engine: Engine,
}

impl AsciiSession {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// Queue a line of input.
    pub fn send_line(&self, line: &str) {
        self.engine.input().extend(encode_line(line));
    }

    /// Queue a script, one command per line.
    pub fn send_script<S: AsRef<str>>(&self, lines: &[S]) {
        for line in lines {
            self.send_line(line.as_ref());
        }
    }

    /// Run to halt and decode everything the engine printed.
    pub fn run(&mut self) -> Result<Transcript, EngineError> {
        let result = self.engine.run_to_halt();
        let transcript = Transcript::decode(self.engine.drain_output());
        result.map(|_| transcript)
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
