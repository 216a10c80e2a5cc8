//! Scripted collaborators — one configurable double implementing every
//! external collaborator trait and recording each request it receives.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quizflow_core::gateway::{
    AdaptNarrativeRequest, BranchClassifier, ClassifyBranchRequest, CompleteRequest,
    ExplainRequest, GatewayError, NarrativeAdapter, Recommendation, RecommendedQuiz, Recommender,
    ResultReasoner, SaveStepRequest, SelectArchetypeRequest, SessionLog, StartRequest,
};
use tokio::sync::Notify;

/// Collaborator double with per-operation scripted replies.
///
/// Defaults: `start` returns `"remote-session"`, `adapt` prefixes the base
/// scenario with `"Adapted: "`, `classify` returns no target, `explain`
/// returns `"Scripted explanation."`, and `select_archetype` fails with a
/// transport error until a reply is scripted.
#[derive(Debug)]
pub struct ScriptedCollaborators {
    start_reply: Result<String, GatewayError>,
    save_step_reply: Result<(), GatewayError>,
    complete_reply: Result<String, GatewayError>,
    adapt_reply: Option<Result<String, GatewayError>>,
    classify_reply: Result<Option<String>, GatewayError>,
    explain_reply: Result<String, GatewayError>,
    select_reply: Result<String, GatewayError>,
    select_hangs: bool,
    recommend_reply: Result<Recommendation, GatewayError>,
    adapt_gate: Option<Arc<Notify>>,
    starts: Mutex<Vec<StartRequest>>,
    save_steps: Mutex<Vec<SaveStepRequest>>,
    completes: Mutex<Vec<CompleteRequest>>,
    adapts: Mutex<Vec<AdaptNarrativeRequest>>,
    classifies: Mutex<Vec<ClassifyBranchRequest>>,
    explains: Mutex<Vec<ExplainRequest>>,
    selects: Mutex<Vec<SelectArchetypeRequest>>,
}

impl Default for ScriptedCollaborators {
    fn default() -> Self {
        Self {
            start_reply: Ok("remote-session".to_owned()),
            save_step_reply: Ok(()),
            complete_reply: Ok("remote-session".to_owned()),
            adapt_reply: None,
            classify_reply: Ok(None),
            explain_reply: Ok("Scripted explanation.".to_owned()),
            select_reply: Err(GatewayError::Transport("no reply scripted".to_owned())),
            select_hangs: false,
            recommend_reply: Ok(Recommendation {
                recommendation_id: "rec-1".to_owned(),
                quiz: RecommendedQuiz {
                    id: "next-quiz".to_owned(),
                    title: "Next Quiz".to_owned(),
                    description: "Try this one next.".to_owned(),
                },
                reasoning: "It fits your result.".to_owned(),
                cta: "Start now".to_owned(),
            }),
            adapt_gate: None,
            starts: Mutex::default(),
            save_steps: Mutex::default(),
            completes: Mutex::default(),
            adapts: Mutex::default(),
            classifies: Mutex::default(),
            explains: Mutex::default(),
            selects: Mutex::default(),
        }
    }
}

impl ScriptedCollaborators {
    /// Creates a double with default replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the `start` reply.
    #[must_use]
    pub fn with_start(mut self, reply: Result<String, GatewayError>) -> Self {
        self.start_reply = reply;
        self
    }

    /// Scripts the `save_step` reply.
    #[must_use]
    pub fn with_save_step(mut self, reply: Result<(), GatewayError>) -> Self {
        self.save_step_reply = reply;
        self
    }

    /// Scripts the `complete` reply.
    #[must_use]
    pub fn with_complete(mut self, reply: Result<String, GatewayError>) -> Self {
        self.complete_reply = reply;
        self
    }

    /// Scripts the `adapt` reply.
    #[must_use]
    pub fn with_adapt(mut self, reply: Result<String, GatewayError>) -> Self {
        self.adapt_reply = Some(reply);
        self
    }

    /// Makes every `adapt` call wait for a permit on `gate` before replying.
    #[must_use]
    pub fn with_adapt_gate(mut self, gate: Arc<Notify>) -> Self {
        self.adapt_gate = Some(gate);
        self
    }

    /// Scripts the `classify` reply.
    #[must_use]
    pub fn with_classify(mut self, reply: Result<Option<String>, GatewayError>) -> Self {
        self.classify_reply = reply;
        self
    }

    /// Scripts the `explain` reply.
    #[must_use]
    pub fn with_explain(mut self, reply: Result<String, GatewayError>) -> Self {
        self.explain_reply = reply;
        self
    }

    /// Scripts the raw `select_archetype` reply.
    #[must_use]
    pub fn with_select(mut self, reply: Result<String, GatewayError>) -> Self {
        self.select_reply = reply;
        self
    }

    /// Makes `select_archetype` never settle.
    #[must_use]
    pub fn with_hanging_select(mut self) -> Self {
        self.select_hangs = true;
        self
    }

    /// Scripts the `recommend` reply.
    #[must_use]
    pub fn with_recommend(mut self, reply: Result<Recommendation, GatewayError>) -> Self {
        self.recommend_reply = reply;
        self
    }

    /// Recorded `start` requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn starts(&self) -> Vec<StartRequest> {
        self.starts.lock().unwrap().clone()
    }

    /// Recorded `save_step` requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn save_steps(&self) -> Vec<SaveStepRequest> {
        self.save_steps.lock().unwrap().clone()
    }

    /// Recorded `complete` requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn completes(&self) -> Vec<CompleteRequest> {
        self.completes.lock().unwrap().clone()
    }

    /// Recorded `adapt` requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn adapts(&self) -> Vec<AdaptNarrativeRequest> {
        self.adapts.lock().unwrap().clone()
    }

    /// Recorded `classify` requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn classifies(&self) -> Vec<ClassifyBranchRequest> {
        self.classifies.lock().unwrap().clone()
    }

    /// Recorded `explain` requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn explains(&self) -> Vec<ExplainRequest> {
        self.explains.lock().unwrap().clone()
    }

    /// Recorded `select_archetype` requests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn selects(&self) -> Vec<SelectArchetypeRequest> {
        self.selects.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionLog for ScriptedCollaborators {
    async fn start(&self, request: StartRequest) -> Result<String, GatewayError> {
        self.starts.lock().unwrap().push(request);
        self.start_reply.clone()
    }

    async fn save_step(&self, request: SaveStepRequest) -> Result<(), GatewayError> {
        self.save_steps.lock().unwrap().push(request);
        self.save_step_reply.clone()
    }

    async fn complete(&self, request: CompleteRequest) -> Result<String, GatewayError> {
        self.completes.lock().unwrap().push(request);
        self.complete_reply.clone()
    }
}

#[async_trait]
impl NarrativeAdapter for ScriptedCollaborators {
    async fn adapt(&self, request: AdaptNarrativeRequest) -> Result<String, GatewayError> {
        let base = request.base_scenario.clone();
        self.adapts.lock().unwrap().push(request);
        if let Some(gate) = &self.adapt_gate {
            gate.notified().await;
        }
        match &self.adapt_reply {
            Some(reply) => reply.clone(),
            None => Ok(format!("Adapted: {base}")),
        }
    }
}

#[async_trait]
impl BranchClassifier for ScriptedCollaborators {
    async fn classify(
        &self,
        request: ClassifyBranchRequest,
    ) -> Result<Option<String>, GatewayError> {
        self.classifies.lock().unwrap().push(request);
        self.classify_reply.clone()
    }
}

#[async_trait]
impl ResultReasoner for ScriptedCollaborators {
    async fn explain(&self, request: ExplainRequest) -> Result<String, GatewayError> {
        self.explains.lock().unwrap().push(request);
        self.explain_reply.clone()
    }

    async fn select_archetype(
        &self,
        request: SelectArchetypeRequest,
    ) -> Result<String, GatewayError> {
        self.selects.lock().unwrap().push(request);
        if self.select_hangs {
            std::future::pending::<()>().await;
        }
        self.select_reply.clone()
    }
}

#[async_trait]
impl Recommender for ScriptedCollaborators {
    async fn recommend(&self, _session_id: &str) -> Result<Recommendation, GatewayError> {
        self.recommend_reply.clone()
    }
}
