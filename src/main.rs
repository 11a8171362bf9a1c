use anyhow::Context;
use clap::Parser;
use openspeak::{
    cli::{output::Output, Cli, Commands},
    rag::index::IndexReport,
    utils::logging::init_tracing,
    AppState, CoachConfig, KnowledgeBase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = CoachConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_tracing(&config.logging, cli.verbose);

    match cli.command {
        Commands::Index { force, corpus } => {
            let mut knowledge = KnowledgeBase::open(&config.rag, &config.embedding).await?;
            if let Some(corpus) = corpus {
                knowledge = knowledge.with_corpus(corpus);
            }
            let report = if force {
                knowledge.rebuild().await?
            } else {
                knowledge.refresh().await?
            };
            print_report(&output, &report);
        }
        Commands::Ask { session, message } => {
            let state = AppState::from_config(config).await?;
            match state.orchestrator.invoke(&session, &message).await {
                Ok(reply) => output.answer(&reply.answer),
                Err(e) => {
                    output.error(&e.to_string());
                    std::process::exit(1);
                }
            }
        }
        Commands::Chat { session } => {
            let session = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let state = AppState::from_config(config).await?;
            output.banner(&session);

            while let Some(line) = output.prompt()? {
                if line.is_empty() || line == "/quit" {
                    break;
                }
                match state.orchestrator.invoke(&session, &line).await {
                    Ok(reply) => output.answer(&reply.answer),
                    // Nothing was persisted, so the user can simply retry.
                    Err(e) => output.error(&e.to_string()),
                }
            }
        }
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&config).context("serializing configuration")?;
            println!("{rendered}");
        }
    }

    Ok(())
}

fn print_report(output: &Output, report: &IndexReport) {
    output.header("Index");
    output.kv("collection", &report.collection);
    output.kv("corpus", &report.source.display().to_string());
    output.kv("chunks", &report.chunk_count.to_string());

    if !report.source_available && report.reused {
        output.warning("Corpus not found; keeping the previously stored index");
        output.hint("Set rag.corpus_path or pass --corpus <FILE>");
    } else if !report.source_available {
        output.warning("Corpus not found; the coach will answer without reference notes");
        output.hint("Set rag.corpus_path or pass --corpus <FILE>");
    } else if report.reused {
        output.success("Stored index matches the corpus, nothing to rebuild");
    } else {
        output.success("Index built");
    }
}
