use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_$][A-Za-z0-9_$]*$";

/// JS string literal; JSON string syntax is valid JS.
pub fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

static IDENTIFIER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// Compiled once per process.
pub fn identifier_regex() -> Result<&'static Regex, &'static regex::Error> {
    IDENTIFIER
        .get_or_init(|| Regex::new(IDENTIFIER_PATTERN))
        .as_ref()
}

pub fn is_identifier(text: &str) -> bool {
    identifier_regex().is_ok_and(|re| re.is_match(text))
}

/// A JS expression tree for object/array literals that may embed host references.
#[derive(Debug, Clone, PartialEq)]
pub enum JsExpr {
    Str(String),
    Bool(bool),
    Json(Value),
    /// Emitted verbatim, e.g. `Scratch.BlockType.COMMAND`.
    HostRef(String),
    Object(Vec<(String, JsExpr)>),
    Array(Vec<JsExpr>),
}

impl JsExpr {
    pub fn render(&self, indent: usize) -> String {
        let mut out = String::new();
        self.write(&mut out, indent);
        out
    }

    fn write(&self, out: &mut String, indent: usize) {
        match self {
            JsExpr::Str(text) => out.push_str(&quote(text)),
            JsExpr::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            JsExpr::Json(value) => out.push_str(&value.to_string()),
            JsExpr::HostRef(path) => out.push_str(path),
            JsExpr::Object(fields) => {
                if fields.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{\n");
                for (key, value) in fields {
                    out.push_str(&spaces(indent + 2));
                    if is_identifier(key) {
                        out.push_str(key);
                    } else {
                        out.push_str(&quote(key));
                    }
                    out.push_str(": ");
                    value.write(out, indent + 2);
                    out.push_str(",\n");
                }
                out.push_str(&spaces(indent));
                out.push('}');
            }
            JsExpr::Array(items) => {
                if items.is_empty() {
                    out.push_str("[]");
                    return;
                }
                out.push_str("[\n");
                for item in items {
                    out.push_str(&spaces(indent + 2));
                    item.write(out, indent + 2);
                    out.push_str(",\n");
                }
                out.push_str(&spaces(indent));
                out.push(']');
            }
        }
    }

    /// JSON view of the tree; host references become their dotted path strings.
    pub fn to_json(&self) -> Value {
        match self {
            JsExpr::Str(text) | JsExpr::HostRef(text) => Value::String(text.clone()),
            JsExpr::Bool(value) => Value::Bool(*value),
            JsExpr::Json(value) => value.clone(),
            JsExpr::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            }
            JsExpr::Array(items) => Value::Array(items.iter().map(JsExpr::to_json).collect()),
        }
    }
}

pub fn spaces(n: usize) -> String {
    " ".repeat(n)
}
