use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "codeshell", about = "Run, debug and complete code snippets remotely", version)]
#[command(group(
    ArgGroup::new("mode")
        .args(["run", "debug", "analyze", "complete", "suggest", "list_languages"])
        .multiple(false)
))]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
pub struct Cli {
    /// Source file to use. Reads stdin when omitted.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Editor language id (javascript, python, cpp, ...).
    #[arg(short = 'l', long)]
    pub language: Option<String>,

    /// Execute the snippet on the remote runtime (default).
    #[arg(long)]
    pub run: bool,

    /// Execute, then show a static stack trace and variable snapshot.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Breakpoint line for --debug. Can be repeated.
    #[arg(short = 'b', long = "breakpoint", action = clap::ArgAction::Append)]
    pub breakpoints: Vec<u32>,

    /// Ask the diagnostics service for errors and hints.
    #[arg(short = 'a', long)]
    pub analyze: bool,

    /// Generate a completion with the model pipeline.
    #[arg(short = 'c', long)]
    pub complete: bool,

    /// Generate improvement suggestions with the model pipeline.
    #[arg(short = 's', long)]
    pub suggest: bool,

    /// List supported languages and their runtimes.
    #[arg(long = "list-languages")]
    pub list_languages: bool,

    /// Render completions and suggestions as Markdown.
    #[arg(long)]
    pub md: bool,
    /// Print completions and suggestions as plain text.
    #[arg(long = "no-md")]
    pub no_md: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoints_accumulate() {
        let cli = Cli::try_parse_from(["codeshell", "main.js", "--debug", "-b", "2", "-b", "5"])
            .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.breakpoints, vec![2, 5]);
        assert_eq!(cli.file, Some(PathBuf::from("main.js")));
    }

    #[test]
    fn modes_are_exclusive() {
        assert!(Cli::try_parse_from(["codeshell", "--run", "--complete"]).is_err());
        assert!(Cli::try_parse_from(["codeshell", "--md", "--no-md"]).is_err());
    }
}
