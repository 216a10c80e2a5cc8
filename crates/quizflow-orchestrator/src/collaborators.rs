//! The external collaborators an orchestrator may call.

use std::sync::Arc;

use quizflow_core::gateway::{
    BranchClassifier, NarrativeAdapter, Recommender, ResultReasoner, SessionLog,
};

/// Optional handles to every external collaborator. A missing handle turns
/// the matching feature off: no adaptation, no classification, and so on.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Remote session log.
    pub session_log: Option<Arc<dyn SessionLog>>,
    /// Narrative adaptation.
    pub narrative: Option<Arc<dyn NarrativeAdapter>>,
    /// Free-text branch classification.
    pub classifier: Option<Arc<dyn BranchClassifier>>,
    /// Explanation and archetype selection.
    pub reasoner: Option<Arc<dyn ResultReasoner>>,
    /// Follow-up quiz recommendation.
    pub recommender: Option<Arc<dyn Recommender>>,
}

impl Collaborators {
    /// Uses one service for every collaborator role.
    #[must_use]
    pub fn all<T>(service: Arc<T>) -> Self
    where
        T: SessionLog
            + NarrativeAdapter
            + BranchClassifier
            + ResultReasoner
            + Recommender
            + 'static,
    {
        Self {
            session_log: Some(service.clone()),
            narrative: Some(service.clone()),
            classifier: Some(service.clone()),
            reasoner: Some(service.clone()),
            recommender: Some(service),
        }
    }
}
