use crate::ast::{
    BlockDeclaration, BlockRef, CodeSegment, CodeTemplate, OperationDeclaration,
    ProcessedArgument, ProcessedBlock, ProcessedOperation, ReportSource,
};
use crate::config::parse_block;
use crate::error::{GenerateError, GenerateResult};
use crate::template::{scan, Segment};
use rand::Rng;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const RANDOM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const RANDOM_ID_LEN: usize = 11;

/// How per-argument identifiers are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// `<opcode>_arg<ordinal>`, stable across runs.
    #[default]
    Deterministic,
    /// Eleven random letters per argument, unique within the run.
    Random,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    pub id_policy: IdPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessWarning {
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    pub blocks: Vec<ProcessedBlock>,
    pub warnings: Vec<ProcessWarning>,
}

pub fn process(blocks: &[BlockDeclaration]) -> GenerateResult<ProcessReport> {
    process_with_options(blocks, ProcessOptions::default())
}

pub fn process_with_options(
    blocks: &[BlockDeclaration],
    options: ProcessOptions,
) -> GenerateResult<ProcessReport> {
    BlockProcessor::new(options).process(blocks)
}

/// Maps raw `blocks` entries (strings or objects) and processes them in one go.
pub fn process_raw(raw: &[Value], options: ProcessOptions) -> GenerateResult<ProcessReport> {
    let blocks = raw
        .iter()
        .enumerate()
        .map(|(index, value)| parse_block(index, value))
        .collect::<GenerateResult<Vec<_>>>()?;
    process_with_options(&blocks, options)
}

pub struct BlockProcessor {
    options: ProcessOptions,
    used_ids: HashSet<String>,
    opcodes: HashMap<String, usize>,
    warnings: Vec<ProcessWarning>,
}

impl BlockProcessor {
    pub fn new(options: ProcessOptions) -> Self {
        Self {
            options,
            used_ids: HashSet::new(),
            opcodes: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn process(mut self, blocks: &[BlockDeclaration]) -> GenerateResult<ProcessReport> {
        let mut processed = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            processed.push(match block {
                BlockDeclaration::Separator => ProcessedBlock::Separator,
                BlockDeclaration::Label { text } => ProcessedBlock::Label { text: text.clone() },
                BlockDeclaration::Operation(op) => {
                    ProcessedBlock::Operation(self.process_operation(index, op)?)
                }
            });
        }
        Ok(ProcessReport {
            blocks: processed,
            warnings: self.warnings,
        })
    }

    fn process_operation(
        &mut self,
        index: usize,
        op: &OperationDeclaration,
    ) -> GenerateResult<ProcessedOperation> {
        if let Some(first) = self.opcodes.insert(op.opcode.clone(), index) {
            return Err(GenerateError::DuplicateOpcode {
                opcode: op.opcode.clone(),
                first: first + 1,
                second: index + 1,
            });
        }
        let block_ref = BlockRef::Opcode(op.opcode.clone());

        let mut arguments: Vec<ProcessedArgument> = Vec::with_capacity(op.arguments.len());
        for (ordinal, arg) in op.arguments.iter().enumerate() {
            if arguments.iter().any(|a| a.name == arg.name) {
                return Err(GenerateError::DuplicateArgument {
                    block: block_ref,
                    argument: arg.name.clone(),
                });
            }
            arguments.push(ProcessedArgument {
                name: arg.name.clone(),
                arg_type: arg.arg_type,
                gen_id: self.generate_id(&op.opcode, ordinal + 1),
                default_value: arg.default_value.clone(),
            });
        }
        let ids: HashMap<&str, &str> = arguments
            .iter()
            .map(|a| (a.name.as_str(), a.gen_id.as_str()))
            .collect();

        let mut shown = HashSet::new();
        for seg in scan(&op.text) {
            if let Segment::Placeholder { name, column } = seg {
                if !ids.contains_key(name.as_str()) {
                    return Err(GenerateError::UnresolvedPlaceholder {
                        block: block_ref,
                        field: "text",
                        placeholder: name,
                        column,
                    });
                }
                shown.insert(name);
            }
        }
        for arg in &arguments {
            if !shown.contains(&arg.name) {
                self.warnings.push(ProcessWarning {
                    message: format!(
                        "Argument '{}' of block '{}' does not appear in its text; the palette will show no input for it.",
                        arg.name, op.opcode
                    ),
                });
            }
        }

        let code = match &op.code {
            Some(code) => Some(resolve_code(&block_ref, code, &ids)?),
            None => None,
        };

        let report = match &op.reports {
            Some(name) => match ids.get(name.as_str()) {
                Some(id) => ReportSource::Argument((*id).to_string()),
                None => {
                    return Err(GenerateError::UnknownReportArgument {
                        block: block_ref,
                        argument: name.clone(),
                    })
                }
            },
            None => match arguments.first() {
                Some(first) => ReportSource::Argument(first.gen_id.clone()),
                None => ReportSource::Expression,
            },
        };

        Ok(ProcessedOperation {
            opcode: op.opcode.clone(),
            block_type: op.block_type,
            text: op.text.clone(),
            code,
            returns: op.returns,
            allow_drop_anywhere: op.allow_drop_anywhere,
            report,
            arguments,
        })
    }

    fn generate_id(&mut self, opcode: &str, ordinal: usize) -> String {
        match self.options.id_policy {
            IdPolicy::Deterministic => {
                let id = format!("{}_arg{}", opcode, ordinal);
                self.used_ids.insert(id.clone());
                id
            }
            IdPolicy::Random => {
                let mut rng = rand::rng();
                loop {
                    let id = (0..RANDOM_ID_LEN)
                        .map(|_| {
                            RANDOM_ID_ALPHABET[rng.random_range(0..RANDOM_ID_ALPHABET.len())]
                                as char
                        })
                        .collect::<String>();
                    if self.used_ids.insert(id.clone()) {
                        return id;
                    }
                }
            }
        }
    }
}

/// Rewrites every `[name]` in a code template to the argument's generated identifier.
fn resolve_code(
    block_ref: &BlockRef,
    code: &str,
    ids: &HashMap<&str, &str>,
) -> GenerateResult<CodeTemplate> {
    let mut segments = Vec::new();
    for seg in scan(code) {
        match seg {
            Segment::Text(text) => segments.push(CodeSegment::Literal(text)),
            Segment::Placeholder { name, column } => match ids.get(name.as_str()) {
                Some(id) => segments.push(CodeSegment::Argument((*id).to_string())),
                None => {
                    return Err(GenerateError::UnresolvedPlaceholder {
                        block: block_ref.clone(),
                        field: "code",
                        placeholder: name,
                        column,
                    })
                }
            },
        }
    }
    Ok(CodeTemplate { segments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArgumentDeclaration, ArgumentType, BlockType};
    use serde_json::json;

    fn op(opcode: &str, block_type: BlockType, text: &str, code: Option<&str>) -> OperationDeclaration {
        OperationDeclaration {
            opcode: opcode.to_string(),
            block_type,
            text: text.to_string(),
            code: code.map(str::to_string),
            returns: None,
            allow_drop_anywhere: false,
            reports: None,
            arguments: Vec::new(),
        }
    }

    fn arg(name: &str, arg_type: ArgumentType) -> ArgumentDeclaration {
        ArgumentDeclaration {
            name: name.to_string(),
            arg_type,
            default_value: None,
        }
    }

    fn only_op(report: &ProcessReport) -> &ProcessedOperation {
        report
            .blocks
            .iter()
            .find_map(ProcessedBlock::as_operation)
            .expect("an operation")
    }

    #[test]
    fn resolves_every_placeholder_to_generated_ids() {
        let mut decl = op("join", BlockType::Reporter, "[a] and [b]", Some("[a] + [b] + [a]"));
        decl.arguments = vec![arg("a", ArgumentType::String), arg("b", ArgumentType::String)];
        let report = process(&[BlockDeclaration::Operation(decl)]).unwrap();
        let processed = only_op(&report);
        assert_eq!(processed.arguments[0].gen_id, "join_arg1");
        assert_eq!(processed.arguments[1].gen_id, "join_arg2");
        let code = processed.code.as_ref().unwrap().interpolated();
        assert_eq!(code, "${join_arg1} + ${join_arg2} + ${join_arg1}");
        assert!(!code.contains('['));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unresolved_code_placeholder_is_an_error() {
        let mut decl = op("bad", BlockType::Command, "do [a]", Some("f([a], [b])"));
        decl.arguments = vec![arg("a", ArgumentType::Number)];
        let err = process(&[BlockDeclaration::Operation(decl)]).unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnresolvedPlaceholder {
                block: BlockRef::Opcode("bad".into()),
                field: "code",
                placeholder: "b".into(),
                column: 8,
            }
        );
    }

    #[test]
    fn unresolved_text_placeholder_is_an_error() {
        let decl = op("bad", BlockType::Command, "say [msg]", None);
        let err = process(&[BlockDeclaration::Operation(decl)]).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::UnresolvedPlaceholder { field: "text", .. }
        ));
    }

    #[test]
    fn deterministic_ids_are_stable_across_runs() {
        let mut decl = op("sum", BlockType::Reporter, "[x] + [y]", Some("[x] + [y]"));
        decl.arguments = vec![arg("x", ArgumentType::Number), arg("y", ArgumentType::Number)];
        let blocks = vec![BlockDeclaration::Operation(decl)];
        assert_eq!(process(&blocks).unwrap().blocks, process(&blocks).unwrap().blocks);
    }

    #[test]
    fn random_ids_are_letters_and_unique() {
        let mut decl = op("r", BlockType::Command, "[a] [b] [c]", Some("[a][b][c]"));
        decl.arguments = vec![
            arg("a", ArgumentType::String),
            arg("b", ArgumentType::String),
            arg("c", ArgumentType::String),
        ];
        let options = ProcessOptions {
            id_policy: IdPolicy::Random,
        };
        let report = process_with_options(&[BlockDeclaration::Operation(decl)], options).unwrap();
        let ids = only_op(&report)
            .arguments
            .iter()
            .map(|a| a.gen_id.clone())
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), 3);
        for id in &ids {
            assert_eq!(id.len(), RANDOM_ID_LEN);
            assert!(id.chars().all(|c| c.is_ascii_alphabetic()));
        }
    }

    #[test]
    fn duplicate_opcodes_are_rejected() {
        let blocks = vec![
            BlockDeclaration::Operation(op("same", BlockType::Command, "a", None)),
            BlockDeclaration::Separator,
            BlockDeclaration::Operation(op("same", BlockType::Command, "b", None)),
        ];
        assert_eq!(
            process(&blocks).unwrap_err(),
            GenerateError::DuplicateOpcode {
                opcode: "same".into(),
                first: 1,
                second: 3,
            }
        );
    }

    #[test]
    fn report_defaults_to_first_declared_argument() {
        let mut decl = op("pick", BlockType::Reporter, "[value] // [note]", Some("[value]"));
        decl.arguments = vec![arg("value", ArgumentType::String), arg("note", ArgumentType::String)];
        let report = process(&[BlockDeclaration::Operation(decl)]).unwrap();
        assert_eq!(only_op(&report).report, ReportSource::Argument("pick_arg1".into()));
    }

    #[test]
    fn named_report_argument_overrides_position() {
        let mut decl = op("pick", BlockType::Boolean, "[note] // [flag]", Some("[flag]"));
        decl.arguments = vec![arg("note", ArgumentType::String), arg("flag", ArgumentType::Boolean)];
        decl.reports = Some("flag".into());
        let report = process(&[BlockDeclaration::Operation(decl.clone())]).unwrap();
        assert_eq!(only_op(&report).report, ReportSource::Argument("pick_arg2".into()));

        decl.reports = Some("missing".into());
        assert!(matches!(
            process(&[BlockDeclaration::Operation(decl)]),
            Err(GenerateError::UnknownReportArgument { .. })
        ));
    }

    #[test]
    fn argumentless_reporter_reports_its_expression() {
        let decl = op("now", BlockType::Reporter, "now", Some("Date.now()"));
        let report = process(&[BlockDeclaration::Operation(decl)]).unwrap();
        assert_eq!(only_op(&report).report, ReportSource::Expression);
    }

    #[test]
    fn hidden_argument_produces_a_warning() {
        let mut decl = op("hidden", BlockType::Command, "do it", Some("go([x])"));
        decl.arguments = vec![arg("x", ArgumentType::Number)];
        let report = process(&[BlockDeclaration::Operation(decl)]).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message.contains("'x'"));
    }

    #[test]
    fn raw_values_are_mapped_before_processing() {
        let raw = vec![
            json!("---"),
            json!("Section"),
            json!({"opcode": "go", "blockType": "COMMAND", "text": "go [n]", "code": "go([n])",
                   "arguments": {"n": {"type": "NUMBER"}}}),
        ];
        let report = process_raw(&raw, ProcessOptions::default()).unwrap();
        assert_eq!(report.blocks[0], ProcessedBlock::Separator);
        assert_eq!(report.blocks[1], ProcessedBlock::Label { text: "Section".into() });
        assert_eq!(
            report.blocks[2].as_operation().unwrap().code.as_ref().unwrap().interpolated(),
            "go(${go_arg1})"
        );

        let raw = vec![json!({"opcode": "x", "blockType": "FOO", "text": "x"})];
        assert!(matches!(
            process_raw(&raw, ProcessOptions::default()),
            Err(GenerateError::UnknownEnumValue { .. })
        ));
    }

    #[test]
    fn separators_and_labels_pass_through() {
        let blocks = vec![
            BlockDeclaration::Label { text: "Hi".into() },
            BlockDeclaration::Separator,
        ];
        let report = process(&blocks).unwrap();
        assert_eq!(
            report.blocks,
            vec![ProcessedBlock::Label { text: "Hi".into() }, ProcessedBlock::Separator]
        );
    }
}
