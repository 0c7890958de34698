use thiserror::Error;

use crate::range::Range;

#[derive(Error, Debug, PartialEq)]
pub enum CompileError {
    #[error("'return' outside function")]
    ReturnOutsideFunction(Range),
    #[error("'break' outside loop")]
    BreakOutsideLoop(Range),
    #[error("'continue' not properly in loop")]
    ContinueOutsideLoop(Range),
    #[error("cannot assign to {1}")]
    InvalidAssignmentTarget(Range, &'static str),
}

impl CompileError {
    pub fn range(&self) -> Range {
        match self {
            CompileError::ReturnOutsideFunction(range)
            | CompileError::BreakOutsideLoop(range)
            | CompileError::ContinueOutsideLoop(range)
            | CompileError::InvalidAssignmentTarget(range, _) => *range,
        }
    }
}
