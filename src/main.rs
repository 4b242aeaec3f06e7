mod cli;

use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use codeshell::{config::Config, language::Language, printer, workbench::Workbench};
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = cli::Cli::parse();

    if args.list_languages {
        for lang in Language::ALL {
            let target = lang.target();
            println!("{:<12} {:<12} .{}", lang.id(), target.runtime_id, target.file_extension);
        }
        return Ok(());
    }

    let cfg = Config::load();

    // Resolve language: CLI, then file extension, then config default
    let language = args
        .language
        .clone()
        .or_else(|| {
            args.file
                .as_deref()
                .and_then(|p| p.extension())
                .and_then(|e| e.to_str())
                .and_then(Language::from_extension)
                .map(|l| l.id().to_string())
        })
        .or_else(|| cfg.get("DEFAULT_LANGUAGE"))
        .unwrap_or_else(|| "javascript".to_string());

    let source = read_source(&args)?;
    if source.trim().is_empty() {
        bail!("no source code provided");
    }

    let markdown = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        cfg.get_bool("PRETTIFY_MARKDOWN")
    };

    let mut bench = Workbench::from_config(&cfg)?;

    if args.debug {
        let session = bench.debug(&source, &language, &args.breakpoints).await?;
        printer::print_debug_session(session);
        bench.clear_debug_session();
    } else if args.analyze {
        let analysis = bench.analyze(&source, &language).await;
        printer::print_analysis(analysis);
    } else if args.complete {
        let completion = bench.complete(&source, &language).await?;
        printer::print_completion(completion, &language, markdown);
    } else if args.suggest {
        let suggestions = bench.suggest(&source, &language).await;
        printer::print_suggestions(&suggestions, markdown);
    } else {
        let result = bench.compile(&source, &language).await;
        printer::print_execution(result);
        if !result.success {
            std::process::exit(1);
        }
    }
    Ok(())
}

fn read_source(args: &cli::Cli) -> Result<String> {
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    if io::stdin().is_terminal() {
        bail!("provide a FILE or pipe source code on stdin");
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
