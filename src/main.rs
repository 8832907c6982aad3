use anyhow::{Context, bail};
use log::{debug, info};
use wrapabbr::buffer::{Buffer, EditorView};
use wrapabbr::cli;
use wrapabbr::command::{Session, WrapWithAbbreviation};
use wrapabbr::config::WrapConfig;
use wrapabbr::context::MarkupTagLocator;
use wrapabbr::engine::BasicEngine;
use wrapabbr::syntax::ScopeClassifier;

/// Parse arguments, load the file, and either print the preview popup or
/// wrap the target region and emit the edited text.
fn main() -> anyhow::Result<()> {
    let cli_args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error parsing arguments: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logger (set RUST_LOG env var to control verbosity)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = WrapConfig::load(cli_args.config.as_deref()).context("Failed to load config")?;

    let mut buffer = Buffer::new();
    buffer
        .load_from_file(&cli_args.file)
        .with_context(|| format!("Failed to open '{}'", cli_args.file.display()))?;
    if let Some(syntax) = &cli_args.syntax {
        buffer.syntax = Some(syntax.clone());
    }
    let selection = cli_args.initial_selection();
    if selection.end() > buffer.len_chars() {
        bail!(
            "Selection {}..{} is outside '{}' ({} characters)",
            selection.begin(),
            selection.end(),
            cli_args.file.display(),
            buffer.len_chars()
        );
    }
    buffer.set_selection(selection);

    let engine = BasicEngine::from_config(&config);
    let classifier = ScopeClassifier::new(&config);
    let locator = MarkupTagLocator;
    let command = WrapWithAbbreviation::new(&engine, &classifier, &locator, &config);
    let mut session = Session::new();

    let mut handler = command.input(&buffer, &session);
    debug!("wrapping {:?}", handler.region());

    if cli_args.preview {
        if let Some(popup) = handler.preview(&cli_args.abbreviation) {
            println!("{}", popup);
        }
        handler.cancel();
        return Ok(());
    }

    let inserted = handler
        .confirm(&mut buffer, &mut session, cli_args.abbreviation.trim())
        .with_context(|| format!("Cannot wrap with '{}'", cli_args.abbreviation))?;

    match inserted {
        Some(region) => info!("inserted {} characters", region.len()),
        None => info!("empty abbreviation, nothing changed"),
    }

    if cli_args.in_place {
        buffer
            .save_to_file(&cli_args.file)
            .with_context(|| format!("Failed to write '{}'", cli_args.file.display()))?;
    } else {
        print!("{}", buffer.text());
    }

    Ok(())
}
