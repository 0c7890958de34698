use disview_lang::{CompiledProgram, SyntaxNode};

/// A compile or parse failure.
pub type StructuralError = disview_lang::Error;

/// Produces the compiled units and the syntax tree for a source text.
///
/// Implementations must be deterministic and free of side effects.
pub trait Frontend {
    #[allow(clippy::result_large_err)]
    fn compile_unit(&self, text: &str) -> Result<CompiledProgram, StructuralError>;

    #[allow(clippy::result_large_err)]
    fn parse_syntax(&self, text: &str) -> Result<SyntaxNode, StructuralError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LangFrontend;

impl Frontend for LangFrontend {
    fn compile_unit(&self, text: &str) -> Result<CompiledProgram, StructuralError> {
        disview_lang::compile(text)
    }

    fn parse_syntax(&self, text: &str) -> Result<SyntaxNode, StructuralError> {
        disview_lang::parse(text).map(|module| module.syntax())
    }
}
