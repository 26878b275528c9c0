use std::path::Path;

use zenflow_core::db::EntityRepository;
use zenflow_core::models::{GratitudeEntry, MoodEntry, MoodType};

use crate::commands::common::{normalize_content, open_store};
use crate::error::CliError;

pub async fn run_mood(mood: MoodType, note: &[String], db_path: &Path) -> Result<MoodEntry, CliError> {
    let store = open_store(db_path).await?;
    let entry = MoodEntry::new(mood, normalize_content(note));
    EntityRepository::new(store.as_ref()).save(&entry).await?;
    println!("{}", entry.id);
    Ok(entry)
}

pub async fn run_gratitude(text: &[String], db_path: &Path) -> Result<GratitudeEntry, CliError> {
    let text = normalize_content(text).ok_or(CliError::EmptyContent)?;
    let store = open_store(db_path).await?;
    let entry = GratitudeEntry::new(text);
    EntityRepository::new(store.as_ref()).save(&entry).await?;
    println!("{}", entry.id);
    Ok(entry)
}
