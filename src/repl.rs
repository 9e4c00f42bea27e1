//! Interactive command loop over stdin.
//!
//! One command per line; unknown input prints usage rather than failing the
//! loop. Commands operate the [`RetrievalPipeline`] and the backend probe.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::error;
use url::Url;

use crate::pipeline::RetrievalPipeline;
use crate::providers::OllamaClient;
use crate::scrape::CrawlOptions;

const HELP: &str = "\
Commands:
  ingest <path>              add a local pdf/docx/txt/md file
  url <url>                  scrape one page and add it
  crawl <url> [depth pages]  crawl from a page and add the result
  ask <question>             answer a question from the stored documents
  list                       show stored documents
  delete <id>                remove a document and its chunks
  probe                      check backend connectivity and models
  help                       show this message
  quit                       exit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ingest(PathBuf),
    ScrapeUrl(Url),
    Crawl { start: Url, options: CrawlOptions },
    Ask(String),
    List,
    Delete(i64),
    Probe,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Errors are user-facing messages.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "ingest" if !rest.is_empty() => Ok(Command::Ingest(PathBuf::from(rest))),
            "ingest" => Err("usage: ingest <path>".to_string()),
            "url" => parse_url(rest).map(Command::ScrapeUrl),
            "crawl" => parse_crawl(rest),
            "ask" if !rest.is_empty() => Ok(Command::Ask(rest.to_string())),
            "ask" => Err("usage: ask <question>".to_string()),
            "list" => Ok(Command::List),
            "delete" => rest
                .parse::<i64>()
                .map(Command::Delete)
                .map_err(|_| "usage: delete <id>".to_string()),
            "probe" => Ok(Command::Probe),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err(String::new()),
            other => Err(format!("unknown command '{other}'; try 'help'")),
        }
    }
}

fn parse_url(rest: &str) -> Result<Url, String> {
    if rest.is_empty() {
        return Err("usage: url <url>".to_string());
    }
    Url::parse(rest).map_err(|err| format!("invalid url '{rest}': {err}"))
}

fn parse_crawl(rest: &str) -> Result<Command, String> {
    let mut parts = rest.split_whitespace();
    let start = parse_url(parts.next().unwrap_or(""))
        .map_err(|_| "usage: crawl <url> [depth pages]".to_string())?;

    let mut options = CrawlOptions::default();
    if let Some(depth) = parts.next() {
        options.max_depth = depth
            .parse()
            .map_err(|_| format!("invalid depth '{depth}'"))?;
    }
    if let Some(pages) = parts.next() {
        options.max_pages = pages
            .parse()
            .map_err(|_| format!("invalid page count '{pages}'"))?;
    }
    Ok(Command::Crawl { start, options })
}

/// Runs the loop until `quit` or end of input.
pub async fn run(pipeline: &RetrievalPipeline, ollama: &OllamaClient) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(format!("{HELP}\n\n> ").as_bytes())
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let output = match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(pipeline, ollama, command).await,
            Err(message) => message,
        };
        if !output.is_empty() {
            stdout.write_all(format!("{output}\n").as_bytes()).await?;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn execute(
    pipeline: &RetrievalPipeline,
    ollama: &OllamaClient,
    command: Command,
) -> String {
    match command {
        Command::Ingest(path) => match pipeline.ingest_file(&path).await {
            Ok(report) => ingest_summary(&report),
            Err(err) => {
                error!(error = %err, "ingest failed");
                format!("ingest failed: {err}")
            }
        },
        Command::ScrapeUrl(url) => match pipeline.ingest_url(&url).await {
            Ok(report) => ingest_summary(&report),
            Err(err) => {
                error!(error = %err, "url ingest failed");
                format!("url ingest failed: {err}")
            }
        },
        Command::Crawl { start, options } => {
            match pipeline.ingest_crawl(&start, &options).await {
                Ok(report) => ingest_summary(&report),
                Err(err) => {
                    error!(error = %err, "crawl failed");
                    format!("crawl failed: {err}")
                }
            }
        }
        Command::Ask(question) => {
            let answer = pipeline.ask(&question).await;
            if answer.sources.is_empty() {
                answer.content
            } else {
                format!("{}\n\nSources: {}", answer.content, answer.sources.join(", "))
            }
        }
        Command::List => match pipeline.list_documents().await {
            Ok(documents) if documents.is_empty() => "no documents stored".to_string(),
            Ok(documents) => documents
                .iter()
                .map(|doc| {
                    format!(
                        "{:>4}  {}  [{}]  {} chunks  {}",
                        doc.id,
                        doc.file_name,
                        doc.file_type,
                        doc.chunk_count,
                        doc.created_at.format("%Y-%m-%d %H:%M"),
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Err(err) => format!("listing failed: {err}"),
        },
        Command::Delete(id) => match pipeline.delete_document(id).await {
            Ok(true) => format!("document {id} deleted"),
            Ok(false) => format!("no document with id {id}"),
            Err(err) => format!("delete failed: {err}"),
        },
        Command::Probe => match ollama.probe().await {
            Ok(report) => {
                let mut lines = vec![format!(
                    "backend reachable; {} model(s) available",
                    report.models.len()
                )];
                for model in &report.models {
                    lines.push(format!("  {}", model.name));
                }
                lines.push(match report.embedding_dims {
                    Some(dims) => {
                        format!("embedding model {}: {dims} dims", report.embedding_model)
                    }
                    None => format!("embedding model {}: FAILED", report.embedding_model),
                });
                lines.push(match &report.chat_reply {
                    Some(reply) => format!("chat model {}: \"{}\"", report.chat_model, reply.trim()),
                    None => format!("chat model {}: FAILED", report.chat_model),
                });
                lines.join("\n")
            }
            Err(err) => format!("probe failed: {err}"),
        },
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

fn ingest_summary(report: &crate::pipeline::IngestReport) -> String {
    if report.skipped_chunks == 0 {
        format!(
            "stored document {} with {} chunks",
            report.document_id, report.chunk_count
        )
    } else {
        format!(
            "stored document {} with {} chunks ({} without embeddings)",
            report.document_id, report.chunk_count, report.skipped_chunks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_verb() {
        assert_eq!(
            Command::parse("ingest notes/file.pdf").unwrap(),
            Command::Ingest(PathBuf::from("notes/file.pdf"))
        );
        assert!(matches!(
            Command::parse("url https://example.com/page").unwrap(),
            Command::ScrapeUrl(_)
        ));
        assert!(matches!(Command::parse("ask what is rust?").unwrap(), Command::Ask(_)));
        assert_eq!(Command::parse("list").unwrap(), Command::List);
        assert_eq!(Command::parse("delete 7").unwrap(), Command::Delete(7));
        assert_eq!(Command::parse("probe").unwrap(), Command::Probe);
        assert_eq!(Command::parse("help").unwrap(), Command::Help);
        assert_eq!(Command::parse("QUIT").unwrap(), Command::Quit);
    }

    #[test]
    fn ask_keeps_the_full_question() {
        match Command::parse("ask  what is the capital of France? ").unwrap() {
            Command::Ask(question) => assert_eq!(question, "what is the capital of France?"),
            other => panic!("expected Ask, got {other:?}"),
        }
    }

    #[test]
    fn crawl_accepts_optional_depth_and_pages() {
        match Command::parse("crawl https://example.com 3 10").unwrap() {
            Command::Crawl { start, options } => {
                assert_eq!(start.as_str(), "https://example.com/");
                assert_eq!(options.max_depth, 3);
                assert_eq!(options.max_pages, 10);
            }
            other => panic!("expected Crawl, got {other:?}"),
        }
        match Command::parse("crawl https://example.com").unwrap() {
            Command::Crawl { options, .. } => {
                assert_eq!(options.max_depth, CrawlOptions::default().max_depth);
            }
            other => panic!("expected Crawl, got {other:?}"),
        }
    }

    #[test]
    fn bad_input_yields_usage_messages() {
        assert!(Command::parse("ingest").unwrap_err().contains("usage"));
        assert!(Command::parse("delete seven").unwrap_err().contains("usage"));
        assert!(Command::parse("url not-a-url").unwrap_err().contains("invalid url"));
        assert!(Command::parse("frobnicate").unwrap_err().contains("unknown command"));
        assert!(Command::parse("   ").unwrap_err().is_empty());
    }
}
