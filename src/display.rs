use chrono::{DateTime, Utc};

use crate::{
    app::{NoteView, Stats},
    notes::Note,
    related::Related,
};

/// Characters of a related note shown before it is cut off
pub const PREVIEW_CHARS: usize = 90;

pub const NO_RELATED_MESSAGE: &str = "no similar notes found, this one is new";

/// Human readable age of `created_at` relative to `now`.
pub fn format_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds();

    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{} minutes ago", s / 60),
        s if s < 86400 => format!("{} hours ago", s / 3600),
        s if s < 7 * 86400 => format!("{} days ago", s / 86400),
        _ => created_at.format("%b %-d, %H:%M").to_string(),
    }
}

pub fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let cut = content.chars().take(PREVIEW_CHARS).collect::<String>();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}

pub fn format_similarity(similarity: f32) -> String {
    format!("{:.0}%", similarity * 100.0)
}

pub fn print_note(note: &Note) {
    println!(
        "[{}] {} (viewed {})",
        note.id,
        format_age(note.created_at, Utc::now()),
        note.view_count
    );
    println!("{}", note.content);
}

pub fn print_related(related: &[Related]) {
    if related.is_empty() {
        println!("{NO_RELATED_MESSAGE}");
        return;
    }

    for r in related {
        println!("  {:>4}  [{}] {}", format_similarity(r.similarity), r.note.id, preview(&r.note.content));
    }
}

pub fn print_view(view: &NoteView) {
    print_note(&view.note);
    println!();
    println!("related:");
    print_related(&view.related);
}

pub fn print_stats(stats: &Stats, embeddings_enabled: bool) {
    println!("notes:    {}", stats.total);
    println!("embedded: {}", stats.embedded);
    if !embeddings_enabled {
        println!("embeddings are disabled, set embedding.api_key in config.yaml");
    }
}
