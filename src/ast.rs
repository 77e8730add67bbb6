use serde_json::Value;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMetadata {
    pub id: String,
    pub name: String,
    pub color1: Option<String>,
    pub comment: Option<String>,
}

/// Shape of an operation block in the host palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Command,
    Reporter,
    Boolean,
    Conditional,
}

impl BlockType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "COMMAND" => Some(Self::Command),
            "REPORTER" => Some(Self::Reporter),
            "BOOLEAN" => Some(Self::Boolean),
            "CONDITIONAL" => Some(Self::Conditional),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::Reporter => "REPORTER",
            Self::Boolean => "BOOLEAN",
            Self::Conditional => "CONDITIONAL",
        }
    }

    pub fn host_ref(self) -> String {
        format!("Scratch.BlockType.{}", self.tag())
    }

    /// Statement-shaped blocks splice their code into the script body.
    pub fn is_statement(self) -> bool {
        matches!(self, Self::Command | Self::Conditional)
    }
}

pub const LABEL_HOST_REF: &str = "Scratch.BlockType.LABEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentType {
    String,
    Boolean,
    Number,
    Color,
    Angle,
}

impl ArgumentType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "STRING" => Some(Self::String),
            "BOOLEAN" => Some(Self::Boolean),
            "NUMBER" => Some(Self::Number),
            "COLOR" => Some(Self::Color),
            "ANGLE" => Some(Self::Angle),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Boolean => "BOOLEAN",
            Self::Number => "NUMBER",
            Self::Color => "COLOR",
            Self::Angle => "ANGLE",
        }
    }

    pub fn host_ref(self) -> String {
        format!("Scratch.ArgumentType.{}", self.tag())
    }

    /// Coercion method called on the descended input in the text backend.
    pub fn accessor(self) -> &'static str {
        match self {
            Self::Number => "asNumber",
            Self::Boolean => "asBoolean",
            Self::String | Self::Color | Self::Angle => "asString",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Boolean,
    Number,
}

impl ValueKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "STRING" => Some(Self::String),
            "BOOLEAN" => Some(Self::Boolean),
            "NUMBER" => Some(Self::Number),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Boolean => "BOOLEAN",
            Self::Number => "NUMBER",
        }
    }
}

/// Type constant handed to `TypedInput` for a block's declared return kind.
pub fn typed_input_tag(returns: Option<ValueKind>) -> &'static str {
    match returns {
        Some(ValueKind::String) => "TYPE_STRING",
        Some(ValueKind::Boolean) => "TYPE_BOOLEAN",
        Some(ValueKind::Number) => "TYPE_NUMBER",
        None => "TYPE_UNKNOWN",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDeclaration {
    pub name: String,
    pub arg_type: ArgumentType,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationDeclaration {
    pub opcode: String,
    pub block_type: BlockType,
    pub text: String,
    pub code: Option<String>,
    pub returns: Option<ValueKind>,
    pub allow_drop_anywhere: bool,
    pub reports: Option<String>,
    pub arguments: Vec<ArgumentDeclaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockDeclaration {
    Separator,
    Label { text: String },
    Operation(OperationDeclaration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionConfig {
    pub extension: ExtensionMetadata,
    pub blocks: Vec<BlockDeclaration>,
}

/// Identifies a block in error messages: its opcode when known, else its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRef {
    Opcode(String),
    Index(usize),
}

impl Display for BlockRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockRef::Opcode(opcode) => write!(f, "'{}'", opcode),
            BlockRef::Index(index) => write!(f, "#{}", index + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeSegment {
    Literal(String),
    Argument(String),
}

/// A code template with every `[name]` placeholder resolved to a generated identifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeTemplate {
    pub segments: Vec<CodeSegment>,
}

impl CodeTemplate {
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|seg| match seg {
            CodeSegment::Literal(text) => text.is_empty(),
            CodeSegment::Argument(_) => false,
        })
    }

    /// Template text with `${id}` interpolations, as carried by the descriptor.
    pub fn interpolated(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                CodeSegment::Literal(text) => out.push_str(text),
                CodeSegment::Argument(id) => {
                    out.push_str("${");
                    out.push_str(id);
                    out.push('}');
                }
            }
        }
        out
    }

    /// Body of a JS template literal that evaluates to the code with arguments substituted.
    pub fn template_literal_body(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                CodeSegment::Literal(text) => out.push_str(&escape_template_literal(text)),
                CodeSegment::Argument(id) => {
                    out.push_str("${");
                    out.push_str(id);
                    out.push('}');
                }
            }
        }
        out
    }
}

fn escape_template_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedArgument {
    pub name: String,
    pub arg_type: ArgumentType,
    pub gen_id: String,
    pub default_value: Option<Value>,
}

/// Value reported by REPORTER/BOOLEAN statement cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSource {
    Argument(String),
    Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedOperation {
    pub opcode: String,
    pub block_type: BlockType,
    pub text: String,
    pub code: Option<CodeTemplate>,
    pub returns: Option<ValueKind>,
    pub allow_drop_anywhere: bool,
    pub report: ReportSource,
    pub arguments: Vec<ProcessedArgument>,
}

impl ProcessedOperation {
    /// Blocks without code only appear in the palette.
    pub fn emits_code(&self) -> bool {
        self.code.as_ref().is_some_and(|code| !code.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedBlock {
    Separator,
    Label { text: String },
    Operation(ProcessedOperation),
}

impl ProcessedBlock {
    pub fn as_operation(&self) -> Option<&ProcessedOperation> {
        match self {
            ProcessedBlock::Operation(op) => Some(op),
            _ => None,
        }
    }
}
