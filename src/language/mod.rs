//! Editor language identifiers and their remote execution targets.

use std::{fmt, str::FromStr};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Java,
    Cpp,
    Go,
    Rust,
    Kotlin,
    Ruby,
    Scala,
    R,
}

/// What the execution service needs to know to run a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub runtime_id: &'static str,
    pub file_extension: &'static str,
}

impl Target {
    pub fn file_name(&self) -> String {
        format!("main.{}", self.file_extension)
    }
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::TypeScript,
        Language::JavaScript,
        Language::Python,
        Language::Java,
        Language::Cpp,
        Language::Go,
        Language::Rust,
        Language::Kotlin,
        Language::Ruby,
        Language::Scala,
        Language::R,
    ];

    /// Canonical editor identifier.
    pub fn id(self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Kotlin => "kotlin",
            Language::Ruby => "ruby",
            Language::Scala => "scala",
            Language::R => "r",
        }
    }

    pub fn target(self) -> Target {
        let (runtime_id, file_extension) = match self {
            Language::TypeScript => ("typescript", "ts"),
            Language::JavaScript => ("nodejs", "js"),
            Language::Python => ("python3", "py"),
            Language::Java => ("java", "java"),
            Language::Cpp => ("c++", "cpp"),
            Language::Go => ("go", "go"),
            Language::Rust => ("rust", "rs"),
            Language::Kotlin => ("kotlin", "kt"),
            Language::Ruby => ("ruby", "rb"),
            Language::Scala => ("scala", "scala"),
            Language::R => ("r", "r"),
        };
        Target { runtime_id, file_extension }
    }

    pub fn from_extension(ext: &str) -> Option<Language> {
        Language::ALL
            .into_iter()
            .find(|l| l.target().file_extension.eq_ignore_ascii_case(ext))
    }
}

impl FromStr for Language {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let lang = match lower.as_str() {
            "typescript" | "ts" => Language::TypeScript,
            "javascript" | "js" => Language::JavaScript,
            "python" | "py" => Language::Python,
            "java" => Language::Java,
            "cpp" | "c++" => Language::Cpp,
            "go" | "golang" => Language::Go,
            "rust" | "rs" => Language::Rust,
            "kotlin" | "kt" => Language::Kotlin,
            "ruby" | "rb" => Language::Ruby,
            "scala" => Language::Scala,
            "r" => Language::R,
            _ => return Err(EngineError::UnsupportedLanguage(s.to_string())),
        };
        Ok(lang)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Resolve an editor language id to its execution target.
pub fn resolve(language_id: &str) -> Result<Target, EngineError> {
    language_id.parse::<Language>().map(Language::target)
}
