//! Per-opcode `case` bodies for the four hook replacements.
//!
//! The statement and expression passes feed the text-generating backend
//! (`JSGenerator`); the two tree passes feed `ScriptTreeGenerator` and are
//! produced by the same [`TreeEmitter`], differing only in the slot they fill.

use crate::ast::{typed_input_tag, ExtensionMetadata, ProcessedBlock, ProcessedOperation, ReportSource};
use crate::js::{quote, spaces};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Statement,
    Expression,
    TreeBuild,
    TreeInput,
}

/// How an opcode is namespaced by the extension id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStyle {
    /// `<id>.<opcode>`, the node kind used by the compiled tree.
    Dotted,
    /// `<id>_<opcode>`, the raw block opcode seen by the tree builder.
    Underscored,
}

impl KeyStyle {
    pub fn key(self, extension_id: &str, opcode: &str) -> String {
        match self {
            KeyStyle::Dotted => format!("{}.{}", extension_id, opcode),
            KeyStyle::Underscored => format!("{}_{}", extension_id, opcode),
        }
    }
}

/// Dispatch-table slot of the tree builder a [`TreeEmitter`] fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSlot {
    StackedBlock,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentCase {
    pub opcode: String,
    pub key: String,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub pass: Pass,
    pub cases: Vec<FragmentCase>,
}

impl Fragment {
    pub fn case(&self, key: &str) -> Option<&FragmentCase> {
        self.cases.iter().find(|c| c.key == key)
    }

    /// Renders the `case` clauses, each body in its own block scope.
    pub fn render(&self, indent: usize) -> String {
        let mut out = String::new();
        for case in &self.cases {
            out.push_str(&format!("{}case {}: {{\n", spaces(indent), quote(&case.key)));
            for line in &case.body {
                out.push_str(&spaces(indent + 2));
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&format!("{}}}\n", spaces(indent)));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragments {
    pub statement: Fragment,
    pub expression: Fragment,
    pub tree_build: Fragment,
    pub tree_input: Fragment,
}

pub fn emit_all(extension: &ExtensionMetadata, blocks: &[ProcessedBlock]) -> Fragments {
    Fragments {
        statement: emit_statement_pass(extension, blocks),
        expression: emit_expression_pass(extension, blocks),
        tree_build: TreeEmitter::new(TreeSlot::StackedBlock).emit(extension, blocks),
        tree_input: TreeEmitter::new(TreeSlot::Input).emit(extension, blocks),
    }
}

fn code_blocks(blocks: &[ProcessedBlock]) -> impl Iterator<Item = &ProcessedOperation> {
    blocks
        .iter()
        .filter_map(ProcessedBlock::as_operation)
        .filter(|op| op.emits_code())
}

fn argument_bindings(op: &ProcessedOperation) -> Vec<String> {
    op.arguments
        .iter()
        .map(|arg| {
            format!(
                "const {} = this.descendInput(node?.{}).{}();",
                arg.gen_id,
                arg.name,
                arg.arg_type.accessor()
            )
        })
        .collect()
}

fn code_literal(op: &ProcessedOperation) -> String {
    op.code
        .as_ref()
        .map(|code| code.template_literal_body())
        .unwrap_or_default()
}

pub fn emit_statement_pass(extension: &ExtensionMetadata, blocks: &[ProcessedBlock]) -> Fragment {
    let cases = code_blocks(blocks)
        .map(|op| {
            let mut body = argument_bindings(op);
            let code = code_literal(op);
            if op.block_type.is_statement() {
                body.push(format!("this.source += `\\n{};\\n`;", code));
            } else {
                let reported = match &op.report {
                    ReportSource::Argument(id) => format!("${{{}}}", id),
                    ReportSource::Expression => format!("({})", code),
                };
                body.push(format!(
                    "this.source += `\\nvm.runtime.visualReport(\"${{block.id}}\", {});\\n`;",
                    reported
                ));
            }
            body.push("return;".to_string());
            FragmentCase {
                opcode: op.opcode.clone(),
                key: KeyStyle::Dotted.key(&extension.id, &op.opcode),
                body,
            }
        })
        .collect();
    Fragment {
        pass: Pass::Statement,
        cases,
    }
}

pub fn emit_expression_pass(extension: &ExtensionMetadata, blocks: &[ProcessedBlock]) -> Fragment {
    let cases = code_blocks(blocks)
        .map(|op| {
            let mut body = argument_bindings(op);
            body.push(format!(
                "return new TypedInput(`{}`, {});",
                code_literal(op),
                typed_input_tag(op.returns)
            ));
            FragmentCase {
                opcode: op.opcode.clone(),
                key: KeyStyle::Dotted.key(&extension.id, &op.opcode),
                body,
            }
        })
        .collect();
    Fragment {
        pass: Pass::Expression,
        cases,
    }
}

/// Builds the tree-node cases shared by both `ScriptTreeGenerator` hooks.
#[derive(Debug, Clone, Copy)]
pub struct TreeEmitter {
    pub case_keys: KeyStyle,
    pub node_kinds: KeyStyle,
    pub slot: TreeSlot,
}

impl TreeEmitter {
    pub fn new(slot: TreeSlot) -> Self {
        Self {
            case_keys: KeyStyle::Underscored,
            node_kinds: KeyStyle::Dotted,
            slot,
        }
    }

    pub fn pass(&self) -> Pass {
        match self.slot {
            TreeSlot::StackedBlock => Pass::TreeBuild,
            TreeSlot::Input => Pass::TreeInput,
        }
    }

    pub fn emit(&self, extension: &ExtensionMetadata, blocks: &[ProcessedBlock]) -> Fragment {
        let cases = code_blocks(blocks)
            .map(|op| {
                let mut body = vec![
                    "return {".to_string(),
                    "  block,".to_string(),
                    format!(
                        "  kind: {},",
                        quote(&self.node_kinds.key(&extension.id, &op.opcode))
                    ),
                ];
                for arg in &op.arguments {
                    body.push(format!(
                        "  {}: this.descendInputOfBlock(block, {}),",
                        arg.name,
                        quote(&arg.name)
                    ));
                }
                body.push("};".to_string());
                FragmentCase {
                    opcode: op.opcode.clone(),
                    key: self.case_keys.key(&extension.id, &op.opcode),
                    body,
                }
            })
            .collect();
        Fragment {
            pass: self.pass(),
            cases,
        }
    }
}
