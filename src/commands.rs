use crate::api::{HttpNotesApi, NotesApi};
use crate::config::Config;
use crate::model::{self, Note};
use crate::ui;
use anyhow::{anyhow, Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

pub fn list(config: Config, json: bool) -> Result<()> {
    let api = HttpNotesApi::new(config.api_base);
    let mut notes = api.list_notes().context("listing notes")?;
    model::sort_notes(&mut notes);
    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(());
    }
    if notes.is_empty() {
        println!("(no notes)");
        return Ok(());
    }
    for note in &notes {
        print_note(note);
    }
    Ok(())
}

pub fn add(config: Config, title: String, content: Option<String>) -> Result<()> {
    model::validate_title(&title)?;
    let api = HttpNotesApi::new(config.api_base);
    let note = api
        .create_note(&title, content.as_deref().unwrap_or_default())
        .context("creating note")?;
    println!("Created note {}", note.id);
    Ok(())
}

pub fn edit(config: Config, id: String, title: Option<String>, content: Option<String>) -> Result<()> {
    let api = HttpNotesApi::new(config.api_base);
    let (new_title, new_content) = match (title, content) {
        (Some(title), Some(content)) => (title, content),
        (title, content) => {
            // fetch the current fields for anything left unspecified
            let notes = api.list_notes().context("fetching current note")?;
            let current = notes
                .into_iter()
                .find(|n| n.id == id)
                .ok_or_else(|| anyhow!("note {} not found", id))?;
            (
                title.unwrap_or(current.title),
                content.unwrap_or(current.content),
            )
        }
    };
    model::validate_title(&new_title)?;
    let note = api
        .update_note(&id, &new_title, &new_content)
        .context("updating note")?;
    println!("Updated note {}", note.id);
    Ok(())
}

pub fn delete(config: Config, id: String, yes: bool) -> Result<()> {
    if !yes && !confirm(&format!("Delete note {}? [y/N] ", id))? {
        println!("Canceled");
        return Ok(());
    }
    let api = HttpNotesApi::new(config.api_base);
    api.delete_note(&id).context("deleting note")?;
    println!("Deleted note {}", id);
    Ok(())
}

pub fn tui(config: Config) -> Result<()> {
    let api = Arc::new(HttpNotesApi::new(config.api_base));
    let base_label = api.base().to_string();
    ui::run(api, base_label)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn print_note(note: &Note) {
    println!("- {}: {}", note.id, note.title);
    for line in note.content.split('\n') {
        if !line.is_empty() {
            println!("    {}", line);
        }
    }
    if let Some(updated) = &note.updated_at {
        println!("    updated: {}", updated);
    } else if let Some(created) = &note.created_at {
        println!("    created: {}", created);
    }
}
