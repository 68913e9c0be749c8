use serde_json::{json, Value};

/// Wire-level RGB triple. Components already clamped to a byte by parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parses `#rrggbb` by reading the 2-hex-digit substrings at offsets 1, 3
    /// and 5. Malformed or short input coerces the affected component to 0 so
    /// a half-configured color block still compiles.
    pub fn from_hex(text: &str) -> Rgb {
        Rgb {
            r: hex_component(text, 1),
            g: hex_component(text, 3),
            b: hex_component(text, 5),
        }
    }

    pub fn to_value(self) -> Value {
        json!({ "r": self.r, "g": self.g, "b": self.b })
    }
}

fn hex_component(text: &str, offset: usize) -> u8 {
    text.get(offset..offset + 2)
        .and_then(|pair| u8::from_str_radix(pair, 16).ok())
        .unwrap_or(0)
}

/// An LED duration is either a compile-time number or a runtime expression
/// string the firmware evaluates; both shapes are legal on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Duration {
    Seconds(f64),
    Expr(String),
}

impl Duration {
    pub fn coerce(text: &str) -> Duration {
        match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Duration::Seconds(value),
            _ => Duration::Expr(text.to_string()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Duration::Seconds(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                json!(*value as i64)
            }
            Duration::Seconds(value) => json!(value),
            Duration::Expr(text) => json!(text),
        }
    }
}

/// One payload unit inside the command envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionCommand {
    Call {
        type_name: String,
        code: String,
    },
    /// Same shape as `Call` but the code sits one level deeper; the downstream
    /// schema for extended actions requires the asymmetry.
    ExtendedCall {
        type_name: String,
        code: String,
    },
    Speech {
        lang: String,
        text: String,
    },
    Led {
        color: Rgb,
        duration: Duration,
    },
}

impl ActionCommand {
    pub fn to_value(&self) -> Value {
        match self {
            ActionCommand::Call { type_name, code } => json!({
                "type": type_name,
                "code": code
            }),
            ActionCommand::ExtendedCall { type_name, code } => json!({
                "type": type_name,
                "data": { "code": code }
            }),
            ActionCommand::Speech { lang, text } => json!({
                "type": "tts",
                "lang": lang,
                "text": text
            }),
            ActionCommand::Led { color, duration } => json!({
                "type": "led",
                "color": color.to_value(),
                "duration": duration.to_value()
            }),
        }
    }
}

/// Every command crosses the wire inside this wrapper; the shape is part of
/// the robot endpoint contract and must not vary.
pub fn envelope(actions: &[ActionCommand]) -> Value {
    let rendered: Vec<Value> = actions.iter().map(ActionCommand::to_value).collect();
    json!({
        "type": "coding_block",
        "data": { "actions": rendered }
    })
}

/// Loop repeat counts default to 0 when the count input is left empty, so an
/// unconfigured block compiles to a no-op loop instead of failing.
pub fn coerce_count(text: Option<&str>) -> String {
    match text {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => "0".to_string(),
    }
}
