use serde_json::json;
use tracing::info;

use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{
    Acknowledgement, ClassList, CompletionResult, Media, UserExercises, UserProfile,
};

impl ApiClient {
    /// Registers the freshly signed-in user with the backend.
    pub async fn post_sign_in(&self) -> Result<UserProfile, ApiError> {
        self.send_json(ApiRequest::put("/user/postSignin")).await
    }

    pub async fn list_classes(&self) -> Result<ClassList, ApiError> {
        self.send_json(ApiRequest::get("/user/classes")).await
    }

    pub async fn join_class(&self, code: &str) -> Result<Acknowledgement, ApiError> {
        self.require_session("/user/joinClass")?;
        let code = code.trim();
        if code.is_empty() {
            return Err(ApiError::InvalidRequest("class code is empty".into()));
        }
        let request = ApiRequest::post("/user/joinClass").json(&json!({ "class_id": code }))?;
        let ack = self.send_json(request).await?;
        info!(class_id = code, "joined class");
        Ok(ack)
    }

    /// Without a class id the backend returns exercises across all joined classes.
    pub async fn list_user_exercises(
        &self,
        class_id: Option<&str>,
    ) -> Result<UserExercises, ApiError> {
        let mut request = ApiRequest::get("/user/getExercises");
        if let Some(class_id) = class_id {
            request = request.query("class_id", class_id);
        }
        self.send_json(request).await
    }

    /// Completing an already completed exercise is accepted and leaves the streak alone.
    pub async fn mark_exercise_complete(
        &self,
        exercise_id: &str,
    ) -> Result<CompletionResult, ApiError> {
        let request =
            ApiRequest::post("/user/markComplete").json(&json!({ "exercise_id": exercise_id }))?;
        let result: CompletionResult = self.send_json(request).await?;
        info!(exercise_id, streak_changed = result.streak_changed, "exercise completed");
        Ok(result)
    }

    pub async fn fetch_exercise_media(&self, exercise_id: &str) -> Result<Media, ApiError> {
        let request = ApiRequest::get("/user/exercise")
            .segment(exercise_id)
            .segment("media");
        self.send_media(request).await
    }
}
