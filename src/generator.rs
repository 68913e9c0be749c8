use crate::block::{split_kind, Block, BlockProgram};
use crate::command::{coerce_count, envelope, ActionCommand, Duration, Rgb};
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct GenError {
    pub message: String,
}

impl GenError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl Display for GenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for GenError {}

/// Closed set of built-in block kinds. Statement kinds emit request-issuing
/// code; value kinds emit an inline expression consumed by a parent input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Action,
    Expression,
    SkillHelper,
    ExtendedAction,
    Speech,
    Led,
    ColorLiteral,
    Text,
    Number,
}

impl BlockKind {
    pub fn is_statement(self) -> bool {
        !matches!(self, BlockKind::ColorLiteral | BlockKind::Text | BlockKind::Number)
    }

    fn wire_type(self) -> Option<&'static str> {
        match self {
            BlockKind::Action => Some("action"),
            BlockKind::Expression => Some("expression"),
            BlockKind::SkillHelper => Some("skill"),
            BlockKind::ExtendedAction => Some("extended_action"),
            _ => None,
        }
    }

    fn primary_field(self) -> Option<&'static str> {
        match self {
            BlockKind::ColorLiteral => Some("COLOUR"),
            BlockKind::Text => Some("TEXT"),
            BlockKind::Number => Some("NUM"),
            _ => None,
        }
    }
}

pub type CustomRule = dyn Fn(&mut Emitter, &Block) -> Result<(), GenError> + Send + Sync;

#[derive(Clone)]
pub enum Rule {
    Builtin(BlockKind),
    Custom(Arc<CustomRule>),
}

/// Generation table for one robot model. Built fresh per compilation so two
/// in-flight compilations for different models never share mutable state.
pub struct Registry {
    model: String,
    rules: HashMap<String, Rule>,
}

const DECLARED_RULES: &[(&str, BlockKind)] = &[
    (".action", BlockKind::Action),
    (".expression", BlockKind::Expression),
    (".skill_helper", BlockKind::SkillHelper),
    (".extended_action", BlockKind::ExtendedAction),
    (".tts", BlockKind::Speech),
    (".set_mouth_led", BlockKind::Led),
    (".color", BlockKind::ColorLiteral),
    (".text", BlockKind::Text),
    (".math_number", BlockKind::Number),
];

impl Registry {
    /// The table is declared under dot-prefixed kinds and every key is then
    /// rewritten to `<model><dotted>` so the same declarations serve all
    /// robot models without kind collisions.
    pub fn for_model(model: &str) -> Registry {
        let mut rules = HashMap::new();
        for (dotted, kind) in DECLARED_RULES {
            rules.insert(namespaced(model, dotted), Rule::Builtin(*kind));
        }
        Registry { model: model.to_string(), rules }
    }

    /// Residual open-extension path for model-supplied kinds the closed enum
    /// does not cover.
    pub fn register_custom(&mut self, dotted_kind: &str, rule: Arc<CustomRule>) {
        self.rules.insert(namespaced(&self.model, dotted_kind), Rule::Custom(rule));
    }

    /// An empty scope resolves against the current model, so generic editor
    /// blocks (`.text`, `.math_number`) work inside any model's program.
    fn lookup(&self, kind: &str) -> Option<Rule> {
        if let Some(rule) = self.rules.get(kind) {
            return Some(rule.clone());
        }
        let (scope, action) = split_kind(kind);
        if scope.is_empty() {
            return self.rules.get(&namespaced(&self.model, &format!(".{}", action))).cloned();
        }
        None
    }
}

fn namespaced(model: &str, dotted: &str) -> String {
    format!("{}{}", model, dotted)
}

#[derive(Debug, Clone)]
pub struct GeneratedProgram {
    pub source_text: String,
}

/// Script output buffer handed to generation rules.
pub struct Emitter {
    serial: String,
    out: String,
    indent: usize,
    loop_counter: usize,
}

impl Emitter {
    fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            out: String::new(),
            indent: 0,
            loop_counter: 0,
        }
    }

    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    pub fn close(&mut self, text: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }

    pub fn next_loop_var(&mut self) -> String {
        let var = format!("i{}", self.loop_counter);
        self.loop_counter += 1;
        var
    }

    /// One outbound robot command. `httpPost` and `baseUrl` are free
    /// identifiers the execution runtime binds before evaluating the script.
    pub fn request(&mut self, payload: &Value) {
        let line = format!(
            "httpPost(baseUrl + \"/websocket/command/{}\", {});",
            self.serial, payload
        );
        self.line(&line);
    }

    fn into_source(self) -> String {
        self.out
    }
}

pub fn generate_script(
    program: &BlockProgram,
    model: &str,
    serial: &str,
) -> Result<GeneratedProgram, GenError> {
    let registry = Registry::for_model(model);
    generate_with_registry(program, &registry, serial)
}

pub fn generate_with_registry(
    program: &BlockProgram,
    registry: &Registry,
    serial: &str,
) -> Result<GeneratedProgram, GenError> {
    let mut emitter = Emitter::new(serial);
    for top in &program.blocks {
        let mut cursor = Some(top);
        while let Some(block) = cursor {
            emit_statement(&mut emitter, registry, block)?;
            cursor = block.next.as_deref();
        }
    }
    Ok(GeneratedProgram { source_text: emitter.into_source() })
}

fn emit_statement(emitter: &mut Emitter, registry: &Registry, block: &Block) -> Result<(), GenError> {
    let rule = registry.lookup(&block.kind).ok_or_else(|| {
        GenError::new(format!(
            "No generation rule for block kind '{}' (model '{}').",
            block.kind, registry.model
        ))
    })?;
    match rule {
        Rule::Custom(custom) => custom(emitter, block),
        Rule::Builtin(kind) => emit_builtin(emitter, registry, kind, block),
    }
}

fn emit_builtin(
    emitter: &mut Emitter,
    registry: &Registry,
    kind: BlockKind,
    block: &Block,
) -> Result<(), GenError> {
    match kind {
        BlockKind::Action | BlockKind::Expression | BlockKind::SkillHelper => {
            let code = field_text(block, "ACTION_NAME");
            let command = ActionCommand::Call {
                type_name: kind.wire_type().unwrap_or_default().to_string(),
                code,
            };
            emit_command_loop(emitter, registry, block, &command)
        }
        BlockKind::ExtendedAction => {
            let code = field_text(block, "ACTION_NAME");
            let command = ActionCommand::ExtendedCall {
                type_name: kind.wire_type().unwrap_or_default().to_string(),
                code,
            };
            emit_command_loop(emitter, registry, block, &command)
        }
        BlockKind::Speech => {
            let text = literal_text(registry, block.value_input("TEXT"))?.unwrap_or_default();
            let lang = field_text(block, "LANGUAGE");
            let payload = envelope(&[ActionCommand::Speech { lang, text }]);
            emitter.request(&payload);
            Ok(())
        }
        BlockKind::Led => {
            let hex = literal_text(registry, block.value_input("COLOR"))?.unwrap_or_default();
            let duration_text =
                literal_text(registry, block.value_input("DURATION"))?.unwrap_or_default();
            let payload = envelope(&[ActionCommand::Led {
                color: Rgb::from_hex(&hex),
                duration: Duration::coerce(&duration_text),
            }]);
            emitter.request(&payload);
            Ok(())
        }
        BlockKind::ColorLiteral | BlockKind::Text | BlockKind::Number => Err(GenError::new(
            format!("Value block '{}' cannot be used as a statement.", block.kind),
        )),
    }
}

fn emit_command_loop(
    emitter: &mut Emitter,
    registry: &Registry,
    block: &Block,
    command: &ActionCommand,
) -> Result<(), GenError> {
    let count_text = value_expr_text(registry, block.value_input("COUNT"))?;
    let count = coerce_count(count_text.as_deref());
    let var = emitter.next_loop_var();
    let payload = envelope(std::slice::from_ref(command));
    emitter.open(&format!("for (var {v} = 0; {v} < {count}; {v}++) {{", v = var, count = count));
    emitter.request(&payload);
    emitter.close("}");
    Ok(())
}

fn field_text(block: &Block, name: &str) -> String {
    block.field(name).map(|f| f.as_str()).unwrap_or_default()
}

fn resolve_value_kind(registry: &Registry, block: &Block) -> Result<BlockKind, GenError> {
    match registry.lookup(&block.kind) {
        Some(Rule::Builtin(kind)) if !kind.is_statement() => Ok(kind),
        Some(_) => Err(GenError::new(format!(
            "Block '{}' cannot be used as a value input.",
            block.kind
        ))),
        None => Err(GenError::new(format!(
            "No generation rule for block kind '{}' (model '{}').",
            block.kind, registry.model
        ))),
    }
}

/// Inline expression text for a value input. Numbers print as literals, text
/// passes through verbatim (it may be a runtime expression), colors expand to
/// the JSON `{r,g,b}` literal the parent payload consumes.
fn value_expr_text(registry: &Registry, input: Option<&Block>) -> Result<Option<String>, GenError> {
    let block = match input {
        Some(block) => block,
        None => return Ok(None),
    };
    let kind = resolve_value_kind(registry, block)?;
    let text = match kind {
        BlockKind::Number => block
            .field("NUM")
            .map(|f| f.as_str())
            .unwrap_or_else(|| "0".to_string()),
        BlockKind::Text => block.field("TEXT").map(|f| f.as_str()).unwrap_or_default(),
        BlockKind::ColorLiteral => {
            let hex = block.field("COLOUR").map(|f| f.as_str()).unwrap_or_default();
            Rgb::from_hex(&hex).to_value().to_string()
        }
        _ => unreachable!("statement kinds rejected above"),
    };
    Ok(Some(text))
}

/// Literal string carried by a value block, for inputs that feed payload
/// fields directly rather than script expressions.
fn literal_text(registry: &Registry, input: Option<&Block>) -> Result<Option<String>, GenError> {
    let block = match input {
        Some(block) => block,
        None => return Ok(None),
    };
    let kind = resolve_value_kind(registry, block)?;
    if let Some(field) = kind.primary_field() {
        return Ok(Some(block.field(field).map(|f| f.as_str()).unwrap_or_default()));
    }
    Ok(None)
}
