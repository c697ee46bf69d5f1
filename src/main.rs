//! Athenaeum command-line interface: administrative ingestion and
//! graph/rank maintenance, plus ad-hoc search for local testing.

use std::fs;
use std::path::PathBuf;

use athenaeum::config::ConfigKey;
use athenaeum::models::{BookMeta, SearchField, SearchParams};
use athenaeum::search::Engine;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Parser)]
#[command(name = "athenaeum")]
#[command(about = "Full-text book search engine: inverted index, BM25 x PageRank hybrid ranking")]
#[command(version)]
struct Cli {
    /// Path to the SQLite corpus database.
    #[arg(long, global = true, default_value = "athenaeum.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliSearchField {
    Content,
    Title,
    Author,
}

impl From<CliSearchField> for SearchField {
    fn from(f: CliSearchField) -> Self {
        match f {
            CliSearchField::Content => SearchField::Content,
            CliSearchField::Title => SearchField::Title,
            CliSearchField::Author => SearchField::Author,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a new book: read its text file, tokenize, and write postings.
    Index {
        /// Path to the book's plain-text file.
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        /// Path to a cover image, if one exists.
        #[arg(long)]
        cover: Option<PathBuf>,
    },

    /// Rewrite postings and statistics for an existing book (e.g. after
    /// changing tokenizer settings).
    Reindex {
        #[arg(long)]
        book_id: i64,
        #[arg(long)]
        file: PathBuf,
    },

    /// Delete a book and its postings, graph edges, and ranking.
    RemoveBook {
        #[arg(long)]
        book_id: i64,
    },

    /// Rebuild the IDF-weighted Jaccard similarity graph from scratch.
    BuildGraph,

    /// Extend the similarity graph with newly indexed books.
    AddToGraph {
        /// Book IDs to add.
        #[arg(long, value_delimiter = ',')]
        book_ids: Vec<i64>,
    },

    /// Recompute PageRank authority scores over the similarity graph.
    Rank,

    /// Recompute aggregate library metadata.
    UpdateMetadata,

    /// Search the corpus.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, value_enum, value_delimiter = ',', default_values_t = vec![CliSearchField::Content])]
        fields: Vec<CliSearchField>,
        #[arg(long)]
        fuzzy: bool,
        #[arg(long)]
        no_highlight: bool,
        #[arg(long)]
        author: Option<String>,
    },

    /// Search with a regex matched against the term vocabulary.
    SearchRegex {
        pattern: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// TF-IDF cosine neighbours of a book.
    FindSimilar {
        #[arg(long)]
        book_id: i64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0.0)]
        min_similarity: f64,
    },

    /// Print corpus and lifecycle-state statistics.
    Stats,

    /// Get or set a hot-reloadable configuration value.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Get,
    Set { key: String, value: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let engine = Engine::open(&cli.db)?;

    match cli.command {
        Commands::Index { file, title, author, cover } => {
            let text = fs::read_to_string(&file)?;
            let meta = BookMeta {
                title,
                author,
                file_path: file.display().to_string(),
                cover_image_path: cover.map(|p| p.display().to_string()),
            };
            let book = engine.index_book(&meta, &text)?;
            println!("indexed book {} ({} words)", book.id, book.word_count);
            engine.update_library_metadata()?;
        }

        Commands::Reindex { book_id, file } => {
            let text = fs::read_to_string(&file)?;
            let book = engine.reindex_book(book_id, &text)?;
            println!("reindexed book {} ({} words)", book.id, book.word_count);
            engine.update_library_metadata()?;
        }

        Commands::RemoveBook { book_id } => {
            engine.remove_book(book_id)?;
            engine.update_library_metadata()?;
            println!("removed book {book_id}");
        }

        Commands::BuildGraph => {
            let pb = progress_bar();
            let edges = engine.build_graph(|p| {
                pb.set_length(p.batches_total as u64);
                pb.set_position(p.batches_done as u64);
                athenaeum::models::ProgressSignal::Continue
            })?;
            pb.finish_and_clear();
            println!("built {edges} similarity edges");
            engine.update_library_metadata()?;
        }

        Commands::AddToGraph { book_ids } => {
            let pb = progress_bar();
            let edges = engine.add_books_to_graph(&book_ids, |p| {
                pb.set_length(p.items_total as u64);
                pb.set_position(p.items_done as u64);
                athenaeum::models::ProgressSignal::Continue
            })?;
            pb.finish_and_clear();
            println!("similarity graph now has {edges} edges");
            engine.update_library_metadata()?;
        }

        Commands::Rank => {
            let metrics = engine.calculate_page_rank()?;
            println!(
                "pagerank converged={} iterations={} final_delta={:.2e} elapsed={:.1}ms",
                metrics.converged, metrics.iterations, metrics.final_delta, metrics.elapsed_ms
            );
            engine.update_library_metadata()?;
        }

        Commands::UpdateMetadata => {
            engine.update_library_metadata()?;
            println!("library metadata updated");
        }

        Commands::Search { query, limit, offset, fields, fuzzy, no_highlight, author } => {
            let params = SearchParams {
                query,
                fields: fields.into_iter().map(Into::into).collect(),
                fuzzy,
                limit,
                offset,
                author_filter: author,
                highlight: !no_highlight,
                ..Default::default()
            };
            let response = engine.search(&params, |book| fs::read_to_string(&book.file_path).ok())?;
            print_response(&response);
        }

        Commands::SearchRegex { pattern, limit } => {
            let params = SearchParams { limit, ..Default::default() };
            let response = engine.search_regex(&pattern, &params, |book| fs::read_to_string(&book.file_path).ok())?;
            print_response(&response);
        }

        Commands::FindSimilar { book_id, limit, min_similarity } => {
            let similar = engine.find_similar(book_id, limit, min_similarity)?;
            for (rank, s) in similar.iter().enumerate() {
                println!("{}. {} by {} (cosine={:.4})", rank + 1, s.book.title, s.book.author, s.cosine_similarity);
            }
        }

        Commands::Stats => {
            let state = engine.state()?;
            println!("lifecycle state: {state:?}");
        }

        Commands::Config { action } => match action {
            ConfigAction::Get => {
                let config = engine.config()?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Set { key, value } => {
                let key = parse_config_key(&key)
                    .ok_or_else(|| format!("unknown configuration key: {key}"))?;
                engine.set_config_value(key, &value)?;
                println!("set {} = {}", key.as_str(), value);
            }
        },
    }

    Ok(())
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn print_response(response: &athenaeum::models::SearchResponse) {
    println!(
        "{} results in {:.1}ms (matched terms: {})",
        response.results.len(),
        response.execution_time_ms,
        response.matched_terms.join(", ")
    );
    for (rank, result) in response.results.iter().enumerate() {
        println!(
            "{}. {} by {} (score={:.4}, bm25={:.4}, authority={:.6})",
            rank + 1,
            result.book.title,
            result.book.author,
            result.score,
            result.bm25_score,
            result.authority_score
        );
        for snippet in &result.snippets {
            println!("   {}", snippet.text);
        }
    }
}

fn parse_config_key(key: &str) -> Option<ConfigKey> {
    use ConfigKey::*;
    Some(match key {
        "minWordLength" => MinWordLength,
        "removeStopWords" => RemoveStopWords,
        "caseSensitive" => CaseSensitive,
        "keepPositions" => KeepPositions,
        "maxTermFrequency" => JaccardMaxTermFrequency,
        "minSharedTerms" => JaccardMinSharedTerms,
        "threshold" => JaccardThreshold,
        "topK" => JaccardTopK,
        "batchSize" => JaccardBatchSize,
        "damping" => PageRankDamping,
        "maxIterations" => PageRankMaxIterations,
        "tolerance" => PageRankTolerance,
        "k1" => Bm25K1,
        "b" => Bm25B,
        "bm25Weight" => Bm25Weight,
        "pagerankWeight" => PageRankWeight,
        "enableProximityBonus" => EnableProximityBonus,
        "snippetCount" => SnippetCount,
        "snippetLength" => SnippetLength,
        "contextBefore" => ContextBefore,
        "contextAfter" => ContextAfter,
        "maxDistance" => FuzzyMaxDistance,
        _ => return None,
    })
}
