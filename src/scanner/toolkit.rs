use std::sync::Arc;
use crate::config::EngineConfig;
use crate::errors::VerifyError;
use crate::expr::{Evaluator, ExprEvaluator};
use crate::extract::{Extractor, RegexExtractor};
use crate::http::{RequestModel, ReqwestTransport, ResponseModel, Transport};
use crate::pool::Pool;

/// Collaborators and model pools shared by every session of a [`SessionPool`](super::SessionPool).
pub struct Toolkit {
    pub transport: Arc<dyn Transport>,
    pub extractor: Arc<dyn Extractor>,
    pub evaluator: Arc<dyn Evaluator>,
    pub requests: Pool<RequestModel>,
    pub responses: Pool<ResponseModel>,
}

impl Toolkit {
    /// Toolkit around `transport` with the default extractor and evaluator.
    pub fn new(transport: Arc<dyn Transport>, max_idle_models: usize) -> Self {
        Self {
            transport,
            extractor: Arc::new(RegexExtractor::new()),
            evaluator: Arc::new(ExprEvaluator),
            requests: Pool::new("requests", max_idle_models),
            responses: Pool::new("responses", max_idle_models),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, VerifyError> {
        let transport = ReqwestTransport::new(&config.http)?;
        Ok(Self::new(Arc::new(transport), config.pool.max_idle_models))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }
}
