//! JSON/HTTP implementation of [`InterviewBackend`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{
    CallMetadata, CodingSubmission, ExecuteCodeRequest, GeneratedCodingQuestion, InterviewBackend,
    InterviewStart, ResumeRequest,
};
use crate::coding::{CodeExecutionResult, CodingEvaluation, CodingHint, ResumeContext};
use crate::config::SyncConfig;
use crate::error::{InterviewError, InterviewResult};
use crate::model::{InterviewStateSnapshot, RoundType};
use crate::transcript::ConversationEntry;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Interview REST API client.
pub struct HttpBackend {
    base_url: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            client,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.backend_url.clone(), config.api_token.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> InterviewResult<reqwest::Response> {
        let res = self.authorized(req).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = res.text().await.unwrap_or_default();
            return Err(InterviewError::Backend { status, message });
        }
        Ok(res)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> InterviewResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(path, "POST");
        let res = self.send(self.client.post(self.url(path)).json(body)).await?;
        Ok(res.json::<R>().await?)
    }

    async fn post_unit<B>(&self, path: &str, body: &B) -> InterviewResult<()>
    where
        B: Serialize + ?Sized,
    {
        debug!(path, "POST");
        self.send(self.client.post(self.url(path)).json(body)).await?;
        Ok(())
    }
}

#[async_trait]
impl InterviewBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn start_interview(&self, interview_id: &str) -> InterviewResult<InterviewStart> {
        self.post_json(
            &format!("/api/interviews/{}/start", interview_id),
            &serde_json::json!({}),
        )
        .await
    }

    #[instrument(skip(self, transcript), fields(entries = transcript.len()))]
    async fn save_transcript(
        &self,
        interview_id: &str,
        transcript: &[ConversationEntry],
    ) -> InterviewResult<()> {
        self.post_unit(
            &format!("/api/interviews/{}/transcript", interview_id),
            &serde_json::json!({ "transcript": transcript }),
        )
        .await
    }

    #[instrument(skip(self, metadata), fields(interview_id = %metadata.interview_id))]
    async fn save_call_metadata(&self, metadata: &CallMetadata) -> InterviewResult<()> {
        self.post_unit(
            &format!("/api/interviews/{}/call-metadata", metadata.interview_id),
            metadata,
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_interview_state(
        &self,
        interview_id: &str,
    ) -> InterviewResult<Option<InterviewStateSnapshot>> {
        let req = self
            .client
            .get(self.url(&format!("/api/interviews/{}/state", interview_id)));
        match self.send(req).await {
            Ok(res) => Ok(Some(res.json().await?)),
            Err(InterviewError::Backend { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn initialize_interview_state(
        &self,
        interview_id: &str,
        round_type: RoundType,
    ) -> InterviewResult<InterviewStateSnapshot> {
        self.post_json(
            &format!("/api/interviews/{}/state", interview_id),
            &serde_json::json!({ "roundType": round_type }),
        )
        .await
    }

    #[instrument(skip(self, conversation), fields(turns = conversation.len()))]
    async fn generate_coding_question(
        &self,
        interview_id: &str,
        conversation: &[ConversationEntry],
    ) -> InterviewResult<GeneratedCodingQuestion> {
        self.post_json(
            &format!("/api/interviews/{}/coding/generate", interview_id),
            &serde_json::json!({ "conversation": conversation }),
        )
        .await
    }

    #[instrument(skip(self, submission), fields(interview_id = %submission.interview_id))]
    async fn evaluate_coding_solution(
        &self,
        submission: &CodingSubmission,
    ) -> InterviewResult<CodingEvaluation> {
        self.post_json("/api/coding/evaluate", submission).await
    }

    #[instrument(skip(self, request), fields(interview_id = %request.interview_id))]
    async fn build_resume_context(
        &self,
        request: &ResumeRequest,
    ) -> InterviewResult<ResumeContext> {
        self.post_json(
            &format!("/api/interviews/{}/coding/resume-context", request.interview_id),
            request,
        )
        .await
    }

    #[instrument(
        skip(self, request),
        fields(problem_id = %request.problem_id, submit = request.submit)
    )]
    async fn execute_code(
        &self,
        request: &ExecuteCodeRequest,
    ) -> InterviewResult<CodeExecutionResult> {
        self.post_json("/api/coding/execute", request).await
    }

    #[instrument(skip(self))]
    async fn get_coding_hint(
        &self,
        interview_id: &str,
        problem_id: &str,
    ) -> InterviewResult<CodingHint> {
        let req = self.client.get(self.url(&format!(
            "/api/interviews/{}/coding/{}/hint",
            interview_id, problem_id
        )));
        let res = self.send(req).await?;
        Ok(res.json().await?)
    }
}
