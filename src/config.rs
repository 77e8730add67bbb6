use crate::ast::{
    ArgumentDeclaration, ArgumentType, BlockDeclaration, BlockRef, BlockType, ExtensionConfig,
    ExtensionMetadata, OperationDeclaration, ValueKind,
};
use crate::error::{EnumKind, GenerateError, GenerateResult};
use crate::js::is_identifier;
use serde_json::{Map, Value};

pub const SEPARATOR: &str = "---";

/// Fixed keys of the compiled tree node; an argument of the same name would overwrite them.
pub const RESERVED_ARGUMENT_NAMES: &[&str] = &["block", "kind"];

pub fn parse_config_str(source: &str) -> anyhow::Result<ExtensionConfig> {
    let document: Value = serde_json::from_str(source)
        .map_err(|e| anyhow::anyhow!("Configuration is not valid JSON: {}", e))?;
    Ok(parse_config(&document)?)
}

/// Validates the top-level document and maps every block declaration.
pub fn parse_config(document: &Value) -> GenerateResult<ExtensionConfig> {
    let root = document.as_object().ok_or_else(|| GenerateError::InvalidField {
        field: "configuration".to_string(),
        message: "expected a JSON object".to_string(),
    })?;
    let extension = root.get("extension").ok_or_else(|| missing("extension"))?;
    let blocks = root.get("blocks").ok_or_else(|| missing("blocks"))?;

    let extension = parse_extension(extension)?;
    let blocks = blocks.as_array().ok_or_else(|| GenerateError::InvalidField {
        field: "blocks".to_string(),
        message: "expected an array".to_string(),
    })?;
    let blocks = blocks
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_block(index, raw))
        .collect::<GenerateResult<Vec<_>>>()?;

    Ok(ExtensionConfig { extension, blocks })
}

fn parse_extension(value: &Value) -> GenerateResult<ExtensionMetadata> {
    let obj = value.as_object().ok_or_else(|| GenerateError::InvalidField {
        field: "extension".to_string(),
        message: "expected an object".to_string(),
    })?;
    let id = obj
        .get("id")
        .ok_or_else(|| missing("extension.id"))
        .and_then(|v| expect_str(v, "extension.id"))?
        .to_string();
    if !is_identifier(&id) {
        return Err(GenerateError::InvalidIdentifier {
            what: "Extension id".to_string(),
            value: id,
        });
    }
    let name = optional_str(obj, "name", "extension.name")?
        .map(str::to_string)
        .unwrap_or_else(|| id.clone());
    let color1 = optional_str(obj, "color1", "extension.color1")?.map(str::to_string);
    let comment = optional_str(obj, "comment", "extension.comment")?
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string);
    Ok(ExtensionMetadata {
        id,
        name,
        color1,
        comment,
    })
}

/// Maps one raw `blocks` entry: `"---"` is a separator, any other string a label,
/// an object an operation (or a label when its blockType is `LABEL`).
pub fn parse_block(index: usize, raw: &Value) -> GenerateResult<BlockDeclaration> {
    let obj = match raw {
        Value::String(text) if text == SEPARATOR => return Ok(BlockDeclaration::Separator),
        Value::String(text) => return Ok(BlockDeclaration::Label { text: text.clone() }),
        Value::Object(obj) => obj,
        _ => {
            return Err(GenerateError::InvalidField {
                field: format!("blocks[{}]", index),
                message: "expected a string or an object".to_string(),
            })
        }
    };

    let opcode = optional_str(obj, "opcode", &block_field(index, "opcode"))?;
    let block_ref = opcode
        .map(|op| BlockRef::Opcode(op.to_string()))
        .unwrap_or(BlockRef::Index(index));

    let block_type_tag = obj
        .get("blockType")
        .ok_or_else(|| missing(&block_field(index, "blockType")))
        .and_then(|v| expect_str(v, &block_field(index, "blockType")))?;
    let text = optional_str(obj, "text", &block_field(index, "text"))?;

    if block_type_tag == "LABEL" {
        let text = text.ok_or_else(|| missing(&block_field(index, "text")))?;
        return Ok(BlockDeclaration::Label {
            text: text.to_string(),
        });
    }

    let block_type =
        BlockType::from_tag(block_type_tag).ok_or_else(|| GenerateError::UnknownEnumValue {
            kind: EnumKind::BlockType,
            value: block_type_tag.to_string(),
            block: block_ref.clone(),
        })?;

    let opcode = opcode
        .ok_or_else(|| missing(&block_field(index, "opcode")))?
        .to_string();
    if !is_identifier(&opcode) {
        return Err(GenerateError::InvalidIdentifier {
            what: format!("Opcode of block #{}", index + 1),
            value: opcode,
        });
    }
    let text = text
        .ok_or_else(|| missing(&block_field(index, "text")))?
        .to_string();
    let code = optional_str(obj, "code", &block_field(index, "code"))?
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let returns = match optional_str(obj, "returns", &block_field(index, "returns"))? {
        Some(tag) => Some(ValueKind::from_tag(tag).ok_or_else(|| {
            GenerateError::UnknownEnumValue {
                kind: EnumKind::ReturnKind,
                value: tag.to_string(),
                block: block_ref.clone(),
            }
        })?),
        None => None,
    };

    let allow_drop_anywhere = match obj.get("allowDropAnywhere") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            return Err(GenerateError::InvalidField {
                field: block_field(index, "allowDropAnywhere"),
                message: "expected a boolean".to_string(),
            })
        }
    };

    let reports = optional_str(obj, "reports", &block_field(index, "reports"))?.map(str::to_string);

    let arguments = match obj.get("arguments") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(args)) => parse_arguments(index, &block_ref, args)?,
        Some(_) => {
            return Err(GenerateError::InvalidField {
                field: block_field(index, "arguments"),
                message: "expected an object mapping argument names to declarations".to_string(),
            })
        }
    };

    Ok(BlockDeclaration::Operation(OperationDeclaration {
        opcode,
        block_type,
        text,
        code,
        returns,
        allow_drop_anywhere,
        reports,
        arguments,
    }))
}

fn parse_arguments(
    index: usize,
    block_ref: &BlockRef,
    args: &Map<String, Value>,
) -> GenerateResult<Vec<ArgumentDeclaration>> {
    let mut out = Vec::with_capacity(args.len());
    for (name, decl) in args {
        let field = format!("blocks[{}].arguments.{}", index, name);
        if !is_identifier(name) {
            return Err(GenerateError::InvalidIdentifier {
                what: format!("Argument of block {}", block_ref),
                value: name.clone(),
            });
        }
        if RESERVED_ARGUMENT_NAMES.contains(&name.as_str()) {
            return Err(GenerateError::ReservedArgumentName {
                block: block_ref.clone(),
                argument: name.clone(),
            });
        }
        let decl = decl.as_object().ok_or_else(|| GenerateError::InvalidField {
            field: field.clone(),
            message: "expected an object".to_string(),
        })?;
        let type_tag = decl
            .get("type")
            .ok_or_else(|| missing(&format!("{}.type", field)))
            .and_then(|v| expect_str(v, &format!("{}.type", field)))?;
        let arg_type =
            ArgumentType::from_tag(type_tag).ok_or_else(|| GenerateError::UnknownEnumValue {
                kind: EnumKind::ArgumentType,
                value: type_tag.to_string(),
                block: block_ref.clone(),
            })?;
        let default_value = match decl.get("defaultValue") {
            None | Some(Value::Null) => None,
            Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => Some(v.clone()),
            Some(_) => {
                return Err(GenerateError::InvalidField {
                    field: format!("{}.defaultValue", field),
                    message: "expected a string, number or boolean".to_string(),
                })
            }
        };
        out.push(ArgumentDeclaration {
            name: name.clone(),
            arg_type,
            default_value,
        });
    }
    Ok(out)
}

fn block_field(index: usize, name: &str) -> String {
    format!("blocks[{}].{}", index, name)
}

fn missing(field: &str) -> GenerateError {
    GenerateError::MissingField {
        field: field.to_string(),
    }
}

fn expect_str<'a>(value: &'a Value, field: &str) -> GenerateResult<&'a str> {
    value.as_str().ok_or_else(|| GenerateError::InvalidField {
        field: field.to_string(),
        message: "expected a string".to_string(),
    })
}

fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    field: &str,
) -> GenerateResult<Option<&'a str>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => expect_str(value, field).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn demo() -> Value {
        json!({
            "extension": {"id": "demo", "name": "Demo", "color1": "#000"},
            "blocks": [
                "Greetings",
                {
                    "opcode": "sayHi",
                    "blockType": "COMMAND",
                    "text": "say [msg]",
                    "code": "log([msg])",
                    "arguments": {"msg": {"type": "STRING", "defaultValue": "hi"}}
                },
                "---",
                {"blockType": "LABEL", "text": "Math"}
            ]
        })
    }

    #[test]
    fn parses_demo_document() {
        let config = parse_config(&demo()).unwrap();
        assert_eq!(config.extension.id, "demo");
        assert_eq!(config.extension.color1.as_deref(), Some("#000"));
        assert_eq!(config.blocks.len(), 4);
        assert_eq!(
            config.blocks[0],
            BlockDeclaration::Label {
                text: "Greetings".into()
            }
        );
        assert_eq!(config.blocks[2], BlockDeclaration::Separator);
        assert_eq!(
            config.blocks[3],
            BlockDeclaration::Label { text: "Math".into() }
        );
        let BlockDeclaration::Operation(op) = &config.blocks[1] else {
            panic!("expected operation");
        };
        assert_eq!(op.block_type, BlockType::Command);
        assert_eq!(op.code.as_deref(), Some("log([msg])"));
        assert_eq!(op.arguments[0].name, "msg");
        assert_eq!(op.arguments[0].default_value, Some(json!("hi")));
    }

    #[test]
    fn missing_top_level_fields_are_reported() {
        let err = parse_config(&json!({"blocks": []})).unwrap_err();
        assert_eq!(
            err,
            GenerateError::MissingField {
                field: "extension".into()
            }
        );
        let err = parse_config(&json!({"extension": {"id": "x"}})).unwrap_err();
        assert_eq!(
            err,
            GenerateError::MissingField {
                field: "blocks".into()
            }
        );
    }

    #[test]
    fn unknown_block_type_names_the_block() {
        let raw = json!({"opcode": "weird", "blockType": "FOO", "text": "x"});
        let err = parse_block(0, &raw).unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnknownEnumValue {
                kind: EnumKind::BlockType,
                value: "FOO".into(),
                block: BlockRef::Opcode("weird".into()),
            }
        );
    }

    #[test]
    fn unknown_argument_type_is_rejected() {
        let raw = json!({
            "opcode": "paint",
            "blockType": "COMMAND",
            "text": "paint [img]",
            "arguments": {"img": {"type": "IMAGE"}}
        });
        assert!(matches!(
            parse_block(3, &raw),
            Err(GenerateError::UnknownEnumValue {
                kind: EnumKind::ArgumentType,
                ..
            })
        ));
    }

    #[test]
    fn unknown_returns_kind_is_rejected() {
        let raw = json!({"opcode": "r", "blockType": "REPORTER", "text": "r", "returns": "LIST"});
        assert!(matches!(
            parse_block(0, &raw),
            Err(GenerateError::UnknownEnumValue {
                kind: EnumKind::ReturnKind,
                ..
            })
        ));
    }

    #[test]
    fn argument_order_follows_document_order() {
        let raw = json!({
            "opcode": "mix",
            "blockType": "REPORTER",
            "text": "[z] [a] [m]",
            "arguments": {
                "z": {"type": "NUMBER"},
                "a": {"type": "BOOLEAN"},
                "m": {"type": "COLOR"}
            }
        });
        let BlockDeclaration::Operation(op) = parse_block(0, &raw).unwrap() else {
            panic!("expected operation");
        };
        let names = op.arguments.iter().map(|a| a.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn identifiers_are_validated() {
        let err = parse_config(&json!({"extension": {"id": "my-ext"}, "blocks": []})).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidIdentifier { .. }));

        let raw = json!({"opcode": "2fast", "blockType": "COMMAND", "text": "go"});
        assert!(matches!(
            parse_block(0, &raw),
            Err(GenerateError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn tree_node_keys_cannot_be_argument_names() {
        for name in ["block", "kind"] {
            let raw = json!({
                "opcode": "tag",
                "blockType": "REPORTER",
                "text": format!("tag [{}]", name),
                "code": format!("[{}]", name),
                "arguments": {name: {"type": "STRING"}}
            });
            assert_eq!(
                parse_block(0, &raw).unwrap_err(),
                GenerateError::ReservedArgumentName {
                    block: BlockRef::Opcode("tag".into()),
                    argument: name.to_string(),
                }
            );
        }
        let raw = json!({
            "opcode": "tag",
            "blockType": "REPORTER",
            "text": "tag [kinds]",
            "arguments": {"kinds": {"type": "STRING"}}
        });
        assert!(parse_block(0, &raw).is_ok());
    }

    #[test]
    fn name_defaults_to_id_and_empty_code_is_absent() {
        let config = parse_config(&json!({
            "extension": {"id": "bare"},
            "blocks": [{"opcode": "noop", "blockType": "COMMAND", "text": "noop", "code": ""}]
        }))
        .unwrap();
        assert_eq!(config.extension.name, "bare");
        assert_eq!(config.extension.color1, None);
        let BlockDeclaration::Operation(op) = &config.blocks[0] else {
            panic!("expected operation");
        };
        assert_eq!(op.code, None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_config_str("{ not json").is_err());
    }
}
