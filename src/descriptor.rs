use crate::ast::{ExtensionMetadata, ProcessedBlock, ProcessedOperation, LABEL_HOST_REF};
use crate::config::SEPARATOR;
use crate::js::JsExpr;

/// Method on the extension class every operation entry points at.
pub const DISPATCH_FUNC: &str = "err";

/// One entry per input block, in declaration order.
pub fn emit_entries(blocks: &[ProcessedBlock]) -> Vec<JsExpr> {
    blocks.iter().map(emit_entry).collect()
}

pub fn emit_entry(block: &ProcessedBlock) -> JsExpr {
    match block {
        ProcessedBlock::Separator => JsExpr::Str(SEPARATOR.to_string()),
        ProcessedBlock::Label { text } => JsExpr::Object(vec![
            ("blockType".into(), JsExpr::HostRef(LABEL_HOST_REF.to_string())),
            ("text".into(), JsExpr::Str(text.clone())),
        ]),
        ProcessedBlock::Operation(op) => emit_operation(op),
    }
}

fn emit_operation(op: &ProcessedOperation) -> JsExpr {
    let mut fields = vec![
        ("opcode".to_string(), JsExpr::Str(op.opcode.clone())),
        ("blockType".to_string(), JsExpr::HostRef(op.block_type.host_ref())),
        ("text".to_string(), JsExpr::Str(op.text.clone())),
    ];
    if let Some(code) = &op.code {
        fields.push(("code".into(), JsExpr::Str(code.interpolated())));
    }
    if let Some(returns) = op.returns {
        fields.push(("returns".into(), JsExpr::Str(returns.tag().to_string())));
    }
    if op.allow_drop_anywhere {
        fields.push(("allowDropAnywhere".into(), JsExpr::Bool(true)));
    }
    if !op.arguments.is_empty() {
        let args = op
            .arguments
            .iter()
            .map(|arg| {
                let mut decl = vec![
                    ("type".to_string(), JsExpr::HostRef(arg.arg_type.host_ref())),
                    ("gen_id".to_string(), JsExpr::Str(arg.gen_id.clone())),
                ];
                if let Some(default) = &arg.default_value {
                    decl.push(("defaultValue".into(), JsExpr::Json(default.clone())));
                }
                (arg.name.clone(), JsExpr::Object(decl))
            })
            .collect();
        fields.push(("arguments".into(), JsExpr::Object(args)));
    }
    fields.push(("func".into(), JsExpr::Str(DISPATCH_FUNC.to_string())));
    JsExpr::Object(fields)
}

/// The object returned by the extension's `getInfo()`.
pub fn emit_info(extension: &ExtensionMetadata, blocks: &[ProcessedBlock]) -> JsExpr {
    let mut fields = vec![
        ("id".to_string(), JsExpr::Str(extension.id.clone())),
        ("name".to_string(), JsExpr::Str(extension.name.clone())),
    ];
    if let Some(color) = &extension.color1 {
        fields.push(("color1".into(), JsExpr::Str(color.clone())));
    }
    fields.push(("blocks".into(), JsExpr::Array(emit_entries(blocks))));
    JsExpr::Object(fields)
}
