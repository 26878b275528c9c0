//! Data models for ZenFlow

mod collection;
mod entity;
mod focus;
mod gratitude;
mod habit;
mod mood;
mod setting;

pub use collection::{Collection, Record};
pub use entity::{new_entity_id, Entity};
pub use focus::{FocusSession, FocusStatus};
pub use gratitude::GratitudeEntry;
pub use habit::Habit;
pub use mood::{MoodEntry, MoodType};
pub use setting::Setting;
