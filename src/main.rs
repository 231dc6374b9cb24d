use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use inquire::error::InquireResult;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod display;
mod editor;
mod eid;
mod embeddings;
mod lock;
mod notes;
mod related;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::{AppLocal, BackfillOpts};
use config::Config;
use eid::Eid;
use lock::FileLock;
use notes::{SearchQuery, SortMode};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_text(text: Option<String>, use_editor: bool) -> anyhow::Result<String> {
    match text {
        Some(text) if !use_editor => Ok(text),
        text => editor::edit(text.as_deref().unwrap_or_default()),
    }
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    init_logging();

    let config = Config::load()?;
    let _lock = FileLock::try_acquire(config.base_path())
        .with_context(|| format!("couldnt lock {}", config.base_path().display()))?;

    let app = AppLocal::new(config)?;

    match args.command {
        #[cfg(feature = "markdown-docs")]
        cli::Command::MarkdownDocs {} => {
            clap_markdown::print_help_markdown::<cli::Args>();
            Ok(())
        }

        cli::Command::Daemon { addr } => web::start_daemon(app, &addr),

        cli::Command::Add { editor, text } => {
            let content = read_text(text, editor)?;
            let note = app.create(&content)?;

            println!("{}", note.id);
            if !note.embedding.is_some() && app.has_embedder() {
                println!("saved without embedding, run `spark embed` later");
            }
            Ok(())
        }

        cli::Command::List {
            keyword,
            random,
            limit,
            offset,
            count,
            json,
        } => {
            let query = SearchQuery {
                keyword,
                sort: if random { SortMode::Random } else { SortMode::Time },
                offset: if count { 0 } else { offset },
                limit: if count { None } else { Some(limit) },
            };
            let notes = app.search(query)?;

            if count {
                println!("{} notes found", notes.len());
                return Ok(());
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
                return Ok(());
            }

            let now = Utc::now();
            for note in &notes {
                println!(
                    "[{}] {}  {}",
                    note.id,
                    display::format_age(note.created_at, now),
                    display::preview(&note.content.replace('\n', " "))
                );
            }
            Ok(())
        }

        cli::Command::Show { id } => {
            let view = app.show(&Eid::from(id))?;
            display::print_view(&view);
            Ok(())
        }

        cli::Command::Related { id } => {
            let related = app.related(&Eid::from(id))?;
            println!("{}", serde_json::to_string_pretty(&related)?);
            Ok(())
        }

        cli::Command::Edit { id, text } => {
            let id = Eid::from(id);
            let content = match text {
                Some(text) => text,
                None => editor::edit(&app.get(&id)?.content)?,
            };

            let note = app.update(&id, &content)?;
            display::print_note(&note);
            Ok(())
        }

        cli::Command::Delete { id, yes } => {
            let id = Eid::from(id);
            let note = app.get(&id)?;

            if !yes {
                match inquire::prompt_confirmation(format!(
                    "Delete \"{}\"?",
                    display::preview(&note.content)
                )) {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            app.delete(&id)?;
            println!("note removed");
            Ok(())
        }

        cli::Command::Embed {} => {
            let report = app.backfill(BackfillOpts::default())?;

            if report.pending == 0 {
                println!("every note already has an embedding");
            } else {
                println!(
                    "{} of {} notes embedded, {} failed",
                    report.embedded, report.pending, report.failed
                );
            }
            Ok(())
        }

        cli::Command::Stats {} => {
            display::print_stats(&app.stats()?, app.has_embedder());
            Ok(())
        }

        cli::Command::Export { path, markdown } => {
            let data = if markdown {
                app.export_markdown()?
            } else {
                app.export_json()?
            };

            match path {
                Some(path) => {
                    std::fs::write(&path, data)
                        .with_context(|| format!("couldnt write {}", path.display()))?;
                    println!("exported to {}", path.display());
                }
                None => println!("{data}"),
            }
            Ok(())
        }

        cli::Command::Import { path } => {
            let data =
                std::fs::read(&path).with_context(|| format!("couldnt read {}", path.display()))?;
            let report = app.import_json(&data)?;

            println!("{} notes imported, {} skipped", report.imported, report.skipped);
            Ok(())
        }

        cli::Command::ImportMd { paths } => {
            let report = app.import_markdown(&paths)?;

            println!("{} markdown files imported", report.imported);
            if report.imported > 0 {
                println!("run `spark embed` to generate their embeddings");
            }
            Ok(())
        }

        cli::Command::TestApi {} => {
            let (name, dimensions) = app.probe_embedder()?;
            println!("{name} is working, embedding dimension: {dimensions}");
            Ok(())
        }
    }
}
