//! Static debug sessions: a line trace and a lexical variable snapshot.
//!
//! Nothing here evaluates code. Variable values are the literal right-hand side text
//! of the last `let`/`const`/`var` declaration seen for each name.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{EngineError, Result},
    execution::{Dispatcher, ExecutionResult},
};

const KEYWORDS: [&[u8]; 3] = [b"let", b"const", b"var"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSession {
    pub session_id: String,
    pub breakpoints: Vec<u32>,
    pub variables: BTreeMap<String, String>,
    pub stack_trace: Vec<String>,
    pub current_line: u32,
}

impl DebugSession {
    pub fn is_breakpoint(&self, line: u32) -> bool {
        self.breakpoints.contains(&line)
    }
}

/// One `let|const|var <name> = <expr>` occurrence. `line` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration<'a> {
    pub line: usize,
    pub name: &'a str,
    pub expression: &'a str,
}

/// Declarations in source order, several per line allowed.
///
/// The expression runs to the next `;`, so an initializer may span lines. Without a
/// semicolon it also ends at a newline outside brackets that is followed by another
/// declaration keyword. Keywords must start a word, so `outlet x = 1` is not a
/// declaration. `line` is the line holding the keyword.
pub fn scan_declarations(source: &str) -> Vec<Declaration<'_>> {
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut line = 1;
    let mut counted = 0;
    let mut i = 0;
    while i < bytes.len() {
        let Some(kw_len) = keyword_at(bytes, i) else {
            i += 1;
            continue;
        };
        line += count_newlines(&bytes[counted..i]);
        counted = i;
        match declaration_after(source, i + kw_len) {
            Some((name, expression, next)) => {
                out.push(Declaration { line, name, expression });
                i = next;
            }
            None => i += kw_len,
        }
    }
    out
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn keyword_at(bytes: &[u8], i: usize) -> Option<usize> {
    if i > 0 && is_ident_byte(bytes[i - 1]) {
        return None;
    }
    KEYWORDS
        .iter()
        .find(|&&kw| bytes[i..].starts_with(kw))
        .map(|kw| kw.len())
        .filter(|&len| bytes.get(i + len).map_or(true, |&b| !is_ident_byte(b)))
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// End of the expression starting at `start`: the next `;`, a top-level newline
/// followed by a declaration keyword, or the end of the text.
fn expression_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b';' => return i,
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'\n' if depth <= 0 => {
                let next = skip_ws(bytes, i + 1);
                if next < bytes.len() && keyword_at(bytes, next).is_some() {
                    return i;
                }
            }
            _ => {}
        }
    }
    bytes.len()
}

/// Parses ` <name> = <expr>` starting right after a keyword. Returns the name, the
/// expression and the index to resume scanning from.
fn declaration_after(text: &str, start: usize) -> Option<(&str, &str, usize)> {
    let bytes = text.as_bytes();

    let name_start = skip_ws(bytes, start);
    if name_start == start {
        return None;
    }
    let mut name_end = name_start;
    while name_end < bytes.len() && is_ident_byte(bytes[name_end]) {
        name_end += 1;
    }
    if name_end == name_start {
        return None;
    }

    let eq = skip_ws(bytes, name_end);
    if bytes.get(eq) != Some(&b'=') {
        return None;
    }

    let expr_start = skip_ws(bytes, eq + 1);
    let expr_end = expression_end(bytes, expr_start);
    let expression = text[expr_start..expr_end].trim_end();
    if expression.is_empty() {
        return None;
    }

    Some((&text[name_start..name_end], expression, expr_end))
}

/// Later declarations of a name overwrite earlier ones.
pub fn variable_snapshot(source: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for decl in scan_declarations(source) {
        vars.insert(decl.name.to_string(), decl.expression.to_string());
    }
    vars
}

/// `"<n>: <text>"` for every line, 1-based.
pub fn stack_trace(source: &str) -> Vec<String> {
    source
        .split('\n')
        .enumerate()
        .map(|(idx, line)| format!("{}: {}", idx + 1, line.trim_end_matches('\r')))
        .collect()
}

/// Build a session from `source`, which must have executed successfully.
pub fn session_from_result(
    source: &str,
    breakpoints: &[u32],
    result: &ExecutionResult,
) -> Result<DebugSession> {
    if !result.success {
        return Err(EngineError::CompilationRequired(result.error_message().to_string()));
    }
    Ok(DebugSession {
        session_id: Uuid::new_v4().to_string(),
        breakpoints: breakpoints.to_vec(),
        variables: variable_snapshot(source),
        stack_trace: stack_trace(source),
        current_line: 0,
    })
}

/// Runs the snippet through the dispatcher and synthesizes a session on success.
#[derive(Clone)]
pub struct DebugSynthesizer {
    dispatcher: Dispatcher,
}

impl DebugSynthesizer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn synthesize(
        &self,
        source: &str,
        language_id: &str,
        breakpoints: &[u32],
    ) -> Result<DebugSession> {
        let result = self.dispatcher.execute(source, language_id).await;
        let session = session_from_result(source, breakpoints, &result)?;
        debug!(
            session = %session.session_id,
            lines = session.stack_trace.len(),
            variables = session.variables.len(),
            "debug session synthesized"
        );
        Ok(session)
    }
}
