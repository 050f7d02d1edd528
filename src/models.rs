use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::duration::ExerciseDuration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassItem {
    #[serde(alias = "class_id")]
    pub id: String,
    pub name: String,
    pub instructor: String,
    /// Free-form schedule text, e.g. "Mon & Wed 7am".
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub student_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassList {
    #[serde(rename = "ownedClasses", default)]
    pub owned_classes: Vec<ClassItem>,
    #[serde(default)]
    pub classes: Vec<ClassItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewClass {
    pub name: String,
    pub instructor: String,
    pub time: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    #[serde(alias = "id")]
    pub exercise_id: String,
    pub class_id: String,
    pub exercise_name: String,
    #[serde(default)]
    pub exercise_description: Option<String>,
    /// Duration in seconds.
    pub time: u32,
    #[serde(deserialize_with = "lenient_utc")]
    pub start_time: DateTime<Utc>,
    #[serde(deserialize_with = "lenient_utc")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub completed: bool,
}

impl Exercise {
    pub fn media_url(&self) -> Option<&str> {
        self.video_url.as_deref().or(self.audio_url.as_deref())
    }

    /// `None` when the stored seconds exceed what the duration input accepts.
    pub fn duration(&self) -> Option<ExerciseDuration> {
        ExerciseDuration::from_secs(self.time).ok()
    }

    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at <= self.end_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.contains("video") {
            MediaKind::Video
        } else {
            MediaKind::Audio
        }
    }

    pub fn upload_mime(self) -> &'static str {
        match self {
            MediaKind::Video => "video/mp4",
            MediaKind::Audio => "audio/mpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub file_name: String,
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExercise {
    pub class_id: String,
    pub name: String,
    pub description: String,
    pub duration: ExerciseDuration,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub media: Option<MediaFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserExercises {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub completed_exercises: Vec<String>,
}

impl UserExercises {
    pub fn is_completed(&self, exercise_id: &str) -> bool {
        self.completed_exercises.iter().any(|id| id == exercise_id)
            || self
                .exercises
                .iter()
                .any(|e| e.exercise_id == exercise_id && e.completed)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionResult {
    #[serde(default)]
    pub streak_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStep {
    CelebrateStreak,
    ReturnToList,
}

impl CompletionResult {
    pub fn next_step(self) -> CompletionStep {
        if self.streak_changed {
            CompletionStep::CelebrateStreak
        } else {
            CompletionStep::ReturnToList
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaPayload {
    pub content: String,
    pub media_type: String,
}

/// What the media endpoint handed back: a link to stream, or the bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    Reference(MediaPayload),
    Inline { bytes: Vec<u8>, media_type: String },
}

impl Media {
    pub fn media_type(&self) -> &str {
        match self {
            Media::Reference(payload) => &payload.media_type,
            Media::Inline { media_type, .. } => media_type,
        }
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(self.media_type())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acknowledgement {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddStudentResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Student {
    #[serde(alias = "userId")]
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseStats {
    pub total_students: u32,
    pub completed_count: u32,
    pub completion_rate: f64,
    /// Seconds.
    pub average_completion_time: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(default, alias = "uid")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// RFC 3339, or a zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` (space separator
/// allowed) read as UTC.
fn lenient_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}
