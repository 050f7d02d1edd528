use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::client::{ApiClient, ApiRequest, FilePart, MultipartForm};
use crate::error::ApiError;
use crate::models::{
    Acknowledgement, AddStudentResponse, ClassItem, Exercise, ExerciseStats, NewClass,
    NewExercise, Student,
};

/// Some endpoints wrap their list in an object, some return it bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExerciseListing {
    Bare(Vec<Exercise>),
    Wrapped { exercises: Vec<Exercise> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StudentListing {
    Bare(Vec<Student>),
    Wrapped { students: Vec<Student> },
}

pub(crate) fn exercise_form(exercise: NewExercise) -> MultipartForm {
    let mut form = MultipartForm::new();
    if let Some(media) = exercise.media {
        form = form.file(FilePart {
            field: "file".into(),
            file_name: media.file_name,
            mime: media.kind.upload_mime().into(),
            bytes: media.bytes,
        });
    }
    form.text("duration", exercise.duration.as_secs().to_string())
        .text("startDate", exercise.start_date.to_rfc3339())
        .text("endDate", exercise.end_date.to_rfc3339())
        .text("classId", exercise.class_id)
        .text("exerciseName", exercise.name)
        .text("exerciseDescription", exercise.description)
}

impl ApiClient {
    pub async fn create_class(&self, class: &NewClass) -> Result<ClassItem, ApiError> {
        self.require_session("/admin/createClass")?;
        if class.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("class name is empty".into()));
        }
        let request = ApiRequest::post("/admin/createClass").json(class)?;
        let created: ClassItem = self.send_json(request).await?;
        info!(class_id = %created.id, "class created");
        Ok(created)
    }

    pub async fn class_info(&self, class_id: &str) -> Result<ClassItem, ApiError> {
        self.send_json(ApiRequest::get("/admin/getClassInfo").query("class_id", class_id))
            .await
    }

    pub async fn add_student_by_email(
        &self,
        email: &str,
        class_id: &str,
    ) -> Result<AddStudentResponse, ApiError> {
        let form = MultipartForm::new()
            .text("email", email.trim())
            .text("class_id", class_id);
        self.send_json(ApiRequest::post("/admin/addUserByEmail").multipart(form))
            .await
    }

    pub async fn list_students(&self, class_id: &str) -> Result<Vec<Student>, ApiError> {
        let listing: StudentListing = self
            .send_json(ApiRequest::get("/admin/getStudents").query("class_id", class_id))
            .await?;
        Ok(match listing {
            StudentListing::Bare(students) | StudentListing::Wrapped { students } => students,
        })
    }

    pub async fn remove_student(
        &self,
        user_id: &str,
        class_id: &str,
    ) -> Result<Acknowledgement, ApiError> {
        let request = ApiRequest::delete("/admin/removeStudent")
            .json(&json!({ "user_id": user_id, "class_id": class_id }))?;
        let ack = self.send_json(request).await?;
        info!(user_id, class_id, "student removed");
        Ok(ack)
    }

    pub async fn list_exercises(&self, class_id: &str) -> Result<Vec<Exercise>, ApiError> {
        let listing: ExerciseListing = self
            .send_json(ApiRequest::get("/admin/getExercises").query("class_id", class_id))
            .await?;
        Ok(match listing {
            ExerciseListing::Bare(exercises) | ExerciseListing::Wrapped { exercises } => exercises,
        })
    }

    pub async fn create_exercise(&self, exercise: NewExercise) -> Result<Exercise, ApiError> {
        self.require_session("/admin/createExercise")?;
        if exercise.name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("exercise name is empty".into()));
        }
        if exercise.end_date < exercise.start_date {
            return Err(ApiError::InvalidRequest(
                "exercise end date is before its start date".into(),
            ));
        }
        let form = exercise_form(exercise);
        let created: Exercise = self
            .send_json(ApiRequest::post("/admin/createExercise").multipart(form))
            .await?;
        info!(exercise_id = %created.exercise_id, "exercise created");
        Ok(created)
    }

    pub async fn update_exercise(&self, exercise: &Exercise) -> Result<Exercise, ApiError> {
        let request = ApiRequest::put("/admin/updateExercise").json(exercise)?;
        self.send_json(request).await
    }

    pub async fn delete_exercise(&self, exercise_id: &str) -> Result<(), ApiError> {
        let request = ApiRequest::delete("/admin/deleteExercise").query("exercise_id", exercise_id);
        self.send_unit(request).await?;
        info!(exercise_id, "exercise deleted");
        Ok(())
    }

    pub async fn exercise_stats(&self, exercise_id: &str) -> Result<ExerciseStats, ApiError> {
        let request = ApiRequest::get("/admin/exercise")
            .segment(exercise_id)
            .segment("stats");
        self.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{MediaFile, MediaKind};

    fn new_exercise(media: Option<MediaFile>) -> NewExercise {
        NewExercise {
            class_id: "c1".into(),
            name: "  Evening Chanting ".into(),
            description: "Slow chant".into(),
            duration: "01:02:03".parse().unwrap(),
            start_date: Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 10, 31, 0, 0, 0).unwrap(),
            media,
        }
    }

    #[test]
    fn test_exercise_form_fields() {
        let form = exercise_form(new_exercise(None));
        assert_eq!(form.field("duration"), Some("3723"));
        assert_eq!(form.field("exerciseName"), Some("  Evening Chanting "));
        assert_eq!(form.field("exerciseDescription"), Some("Slow chant"));
        assert_eq!(form.field("classId"), Some("c1"));
        assert_eq!(form.field("startDate"), Some("2026-10-01T00:00:00+00:00"));
        assert!(form.files().is_empty());
    }

    #[test]
    fn test_exercise_form_file_part() {
        let form = exercise_form(new_exercise(Some(MediaFile {
            file_name: "breath.mov".into(),
            kind: MediaKind::Video,
            bytes: vec![0, 1, 2],
        })));
        let file = &form.files()[0];
        assert_eq!(file.field, "file");
        assert_eq!(file.file_name, "breath.mov");
        assert_eq!(file.mime, "video/mp4");
    }

    #[test]
    fn test_listings_accept_both_shapes() {
        let bare: StudentListing =
            serde_json::from_str(r#"[{"user_id": "u1", "email": "a@b.c"}]"#).unwrap();
        let wrapped: StudentListing = serde_json::from_str(
            r#"{"students": [{"userId": "u1", "email": "a@b.c"}]}"#,
        )
        .unwrap();
        for listing in [bare, wrapped] {
            match listing {
                StudentListing::Bare(s) | StudentListing::Wrapped { students: s } => {
                    assert_eq!(s[0].user_id, "u1")
                }
            }
        }
    }
}
