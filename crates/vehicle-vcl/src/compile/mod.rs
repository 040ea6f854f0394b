//! High-level compilation pipeline.
//!
//! This is the public API of the compiler: lex, parse, scope-check,
//! elaborate, normalise, and lower to VNNLib queries, in that order. Each
//! pass returns a fresh tree; an error aborts the pipeline.

use crate::ast::surface;
use crate::error::{CompileError, DiagnosticFormatter};
use crate::foundation::{SourceMap, Span};
use crate::lexer::Token;
use crate::parser::parse_prog;
use crate::vnnlib::PropertyQuery;
use logos::Logos;
use std::path::PathBuf;
use tracing::debug;

/// Compile one Vehicle source file to its property queries.
///
/// Returns the populated [`SourceMap`] in both outcomes so callers can
/// format errors with source context.
pub fn compile_source(
    path: impl Into<PathBuf>,
    source: String,
) -> (SourceMap, Result<Vec<PropertyQuery>, CompileError>) {
    let mut source_map = SourceMap::new();
    let file_id = source_map.add_file(path.into(), source.clone());
    let result = run_pipeline(&source, file_id);
    (source_map, result)
}

fn run_pipeline(source: &str, file_id: u16) -> Result<Vec<PropertyQuery>, CompileError> {
    // 1. Lex
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(CompileError::InvalidToken {
                    span: Span::new(file_id, span.start as u32, span.end as u32, 1),
                });
            }
        }
    }
    debug!(tokens = tokens.len(), "lexed");

    // 2. Parse
    let parsed: surface::Prog = parse_prog(&tokens, file_id)?;
    debug!(declarations = parsed.len(), "parsed");

    // 3. Scope check: names become indices and identifiers.
    let scoped = crate::scope::scope_prog(&parsed)?;

    // 4. Elaborate: holes and implicits become solved metas.
    let elaborated = crate::elaborate::elab_prog(&scoped)?;

    // 5. Normalise.
    let (normalised, normaliser) = crate::normalise::norm_prog(&elaborated)?;

    // 6. Lower to VNNLib.
    let queries = crate::vnnlib::compile_prog(&normalised, &normaliser)?;
    debug!(queries = queries.len(), "compiled");
    Ok(queries)
}

/// Format a pipeline error with source context.
pub fn format_error(error: &CompileError, sources: &SourceMap) -> String {
    DiagnosticFormatter::new(sources).format(error)
}

#[cfg(test)]
mod tests;
