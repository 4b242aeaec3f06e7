//! Printers: colored status text and markdown (termimad).

use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::{
    analysis::{AnalysisResult, CompletionResult, Severity},
    debug::DebugSession,
    execution::ExecutionResult,
};

pub struct TextPrinter {
    pub color: Option<&'static str>,
}

impl TextPrinter {
    pub fn print(&self, text: &str) {
        println!("{}", self.paint(text));
    }

    fn paint(&self, text: &str) -> String {
        match self.color {
            Some("green") => text.green().to_string(),
            Some("red") => text.red().to_string(),
            Some("cyan") => text.cyan().to_string(),
            Some("yellow") => text.yellow().to_string(),
            Some("magenta") => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

#[derive(Default)]
pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}

pub fn print_execution(result: &ExecutionResult) {
    if result.success {
        print!("{}", result.output.as_deref().unwrap_or_default());
        let mut stats = Vec::new();
        if let Some(ms) = result.execution_time_ms {
            stats.push(format!("{ms} ms"));
        }
        if let Some(bytes) = result.memory_bytes {
            stats.push(format!("{bytes} bytes"));
        }
        if !stats.is_empty() {
            eprintln!("{}", format!("[{}]", stats.join(", ")).cyan());
        }
    } else {
        TextPrinter { color: Some("red") }.print(&format!("error: {}", result.error_message()));
    }
    for w in result.warnings.iter().flatten() {
        TextPrinter { color: Some("yellow") }.print(&format!("warning: {w}"));
    }
}

pub fn print_debug_session(session: &DebugSession) {
    TextPrinter { color: Some("magenta") }.print(&format!("session {}", session.session_id));
    for (idx, line) in session.stack_trace.iter().enumerate() {
        let line_no = idx as u32 + 1;
        let marker = if session.is_breakpoint(line_no) { "●" } else { " " };
        let current = if idx as u32 == session.current_line { ">" } else { " " };
        println!("{}{} {}", marker.red(), current.green(), line);
    }
    if !session.variables.is_empty() {
        println!();
        TextPrinter { color: Some("cyan") }.print("variables (lexical)");
        for (name, expr) in &session.variables {
            println!("  {} = {}", name.green(), expr);
        }
    }
}

pub fn print_analysis(result: &AnalysisResult) {
    if result.is_empty() {
        TextPrinter { color: Some("green") }.print("no findings");
        return;
    }
    for issue in &result.errors {
        let (label, color) = match issue.severity {
            Severity::Error => ("error", "red"),
            Severity::Warning => ("warning", "yellow"),
        };
        TextPrinter { color: Some(color) }
            .print(&format!("{label} line {}: {}", issue.line, issue.message));
        for s in issue.suggestions.iter().flatten() {
            println!("    help: {s}");
        }
    }
    for s in &result.suggestions {
        println!(
            "{} line {}: {} ({:.0}%)",
            "suggestion".cyan(),
            s.line,
            s.suggestion,
            s.confidence * 100.0
        );
    }
}

pub fn print_completion(completion: &CompletionResult, language_id: &str, markdown: bool) {
    if markdown {
        MarkdownPrinter::default()
            .print(&format!("```{}\n{}\n```", language_id, completion.completion_text));
    } else {
        println!("{}", completion.completion_text);
    }
    eprintln!("{}", format!("confidence {:.2}", completion.confidence).cyan());
}

pub fn print_suggestions(suggestions: &[String], markdown: bool) {
    if suggestions.is_empty() {
        TextPrinter { color: Some("yellow") }.print("no suggestions");
        return;
    }
    if markdown {
        let md: String = suggestions.iter().map(|s| format!("* {s}\n")).collect();
        MarkdownPrinter::default().print(&md);
    } else {
        for s in suggestions {
            println!("{s}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncolored_printer_passes_text_through() {
        assert_eq!(TextPrinter { color: None }.paint("plain"), "plain");
        assert_eq!(TextPrinter { color: Some("unknown") }.paint("plain"), "plain");
    }

    #[test]
    fn colored_printer_wraps_text() {
        let painted = TextPrinter { color: Some("red") }.paint("oops");
        assert!(painted.contains("oops"));
        assert_ne!(painted, "oops");
    }
}
