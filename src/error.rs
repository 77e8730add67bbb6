use crate::ast::BlockRef;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Which closed enumeration a rejected tag was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    BlockType,
    ArgumentType,
    ReturnKind,
}

impl Display for EnumKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EnumKind::BlockType => "blockType",
            EnumKind::ArgumentType => "argument type",
            EnumKind::ReturnKind => "returns kind",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("Configuration must include a '{field}' property.")]
    MissingField { field: String },

    #[error("Invalid '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("{what} '{value}' is not a valid identifier (expected letters, digits, '_' or '$', not starting with a digit).")]
    InvalidIdentifier { what: String, value: String },

    #[error("Unknown {kind} '{value}' in block {block}.")]
    UnknownEnumValue {
        kind: EnumKind,
        value: String,
        block: BlockRef,
    },

    #[error("Unresolved placeholder '[{placeholder}]' in {field} of block {block} (column {column}); no argument named '{placeholder}' is declared.")]
    UnresolvedPlaceholder {
        block: BlockRef,
        field: &'static str,
        placeholder: String,
        column: usize,
    },

    #[error("Duplicate opcode '{opcode}' (blocks {first} and {second}).")]
    DuplicateOpcode {
        opcode: String,
        first: usize,
        second: usize,
    },

    #[error("Duplicate argument '{argument}' in block {block}.")]
    DuplicateArgument { block: BlockRef, argument: String },

    #[error("Argument name '{argument}' in block {block} is reserved for the compiled node's own fields; rename it.")]
    ReservedArgumentName { block: BlockRef, argument: String },

    #[error("Block {block} reports argument '{argument}', which is not declared.")]
    UnknownReportArgument { block: BlockRef, argument: String },
}

pub type GenerateResult<T> = Result<T, GenerateError>;
