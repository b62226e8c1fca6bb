use std::path::{Path, PathBuf};

use console::{Term, style};
use dialoguer::Input;
use tracing::info;

use crate::config::{self, CONFIG_FILE_NAME, Config};
use crate::index::VectorStore;
use crate::ingest::Ingestor;
use crate::openai::OpenAiClient;
use crate::query::{Answer, QueryEngine};
use crate::{Result, SopError};

/// Build the vector index from the configured (or overridden) data dir.
#[inline]
pub async fn ingest(config: Config, data_dir: Option<PathBuf>) -> Result<()> {
    let api_key = config::load_api_key().map_err(|e| SopError::Config(e.to_string()))?;
    let client =
        OpenAiClient::new(&config.api, api_key).map_err(|e| SopError::Config(format!("{e:#}")))?;

    let data_dir = data_dir.unwrap_or_else(|| config.storage.data_dir.clone());
    let index_dir = config.storage.index_dir.clone();

    println!(
        "📂 Building index from PDFs under {}",
        style(data_dir.display()).cyan()
    );

    let ingestor = Ingestor::new(config, client);
    let stats = ingestor.run(&data_dir).await?;

    println!("✅ Index built successfully!");
    println!("  Documents: {}", stats.documents);
    println!("  Pages: {}", stats.pages);
    println!("  Chunks: {}", stats.chunks);
    println!("  Embeddings: {}", stats.embeddings);
    println!("  Duration: {:?}", stats.elapsed);
    println!("  Location: {}", index_dir.display());

    Ok(())
}

/// Answer a single question and print it with its sources.
#[inline]
pub async fn ask(config: Config, question: &str) -> Result<()> {
    let api_key = config::load_api_key().map_err(|e| SopError::Config(e.to_string()))?;
    let engine = QueryEngine::open(&config, api_key).await?;

    let answer = engine.answer(question).await?;
    print_answer(&answer);

    Ok(())
}

/// Interactive question loop. Per-request failures are reported and the
/// loop keeps serving; `clear` resets the screen, `exit` leaves.
#[inline]
pub async fn chat(config: Config) -> Result<()> {
    let api_key = config::load_api_key().map_err(|e| SopError::Config(e.to_string()))?;
    let engine = QueryEngine::open(&config, api_key).await?;

    let term = Term::stdout();
    println!("{}", style("⚡ SOP Finder").bold().cyan());
    println!("Ask about your procedures. Type 'clear' to reset the screen, 'exit' to leave.");
    println!();

    loop {
        let input: String = Input::new()
            .with_prompt("Question")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| SopError::Config(format!("failed to read input: {e}")))?;

        match input.trim() {
            "exit" | "quit" => break,
            "clear" => {
                term.clear_screen()?;
            }
            question => match engine.answer(question).await {
                Ok(answer) => print_answer(&answer),
                Err(SopError::Validation(message)) => {
                    println!("{}", style(format!("⚠ {message}")).yellow());
                }
                Err(e) => {
                    info!("Request failed: {}", e);
                    println!("{}", style(format!("❌ Request failed: {e}")).red());
                }
            },
        }
        println!();
    }

    Ok(())
}

/// Show credential, configuration and index status.
#[inline]
pub async fn show_status(config: Config) -> Result<()> {
    println!("📊 SOP Finder Status");
    println!("{}", "=".repeat(40));
    println!();

    println!("🔑 Credential:");
    match config::load_api_key() {
        Ok(_) => println!("   ✅ {} is set", config::API_KEY_VAR),
        Err(e) => println!("   ❌ {e}"),
    }

    println!();
    println!("⚙️  Configuration:");
    println!("   Embedding model: {}", config.api.embedding_model);
    println!("   Chat model: {}", config.api.chat_model);
    println!("   Retrieval policy: {:?}", config.retrieval.policy);
    println!(
        "   Chunking: {} chars, {} overlap",
        config.chunking.max_chars, config.chunking.overlap
    );

    println!();
    println!("🔍 Index:");
    match VectorStore::open(
        &config.storage.index_dir,
        config.api.embedding_dimension as usize,
    )
    .await
    {
        Ok(store) => match store.count().await {
            Ok(count) => {
                println!(
                    "   ✅ {} chunks indexed at {}",
                    count,
                    config.storage.index_dir.display()
                );
            }
            Err(e) => println!("   ⚠️  Index opened but unreadable: {e}"),
        },
        Err(e) => {
            println!("   ❌ {e}");
            println!("   Use 'sop-finder ingest' to build the index.");
        }
    }

    Ok(())
}

/// Print the effective configuration.
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", style("📋 Effective Configuration").bold().cyan());
    println!();

    let content = toml::to_string_pretty(config)
        .map_err(|e| SopError::Config(format!("failed to render configuration: {e}")))?;
    println!("{content}");

    Ok(())
}

/// Write the effective configuration to `./sop-finder.toml`.
#[inline]
pub fn init_config(config: &Config) -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(SopError::Config(format!(
            "{} already exists; remove it first",
            path.display()
        )));
    }

    config
        .write_to(path)
        .map_err(|e| SopError::Config(e.to_string()))?;

    println!("✅ Wrote {}", path.display());
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!();
    println!("{}", style("✅ Answer").bold().green());
    println!("{}", answer.text);

    if !answer.sources.is_empty() {
        println!();
        println!("{}", style("📄 Sources consulted").bold());
        for source in &answer.sources {
            println!("  - {source}");
        }
    }
}
