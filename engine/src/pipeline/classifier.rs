//! Result classification
//!
//! Maps the terminal outcome of a pipeline onto the closed set of response
//! kinds. Infrastructure faults are reported with the error's user hint, never
//! with its full display text, so temp paths and command lines stay in the
//! logs.

use sdk::errors::{EngineError, EvalbotErrorExt};
use sdk::types::{ConversationId, EvaluationOutcome, ResponseKind, ResponseMessage};

/// Terminal outcome of a pipeline run
#[derive(Debug)]
pub enum StageOutcome {
    NoExpressions,
    InstallFailed(String),
    Evaluated(EvaluationOutcome),
    Infrastructure(EngineError),
}

impl From<EngineError> for StageOutcome {
    fn from(error: EngineError) -> Self {
        Self::Infrastructure(error)
    }
}

pub fn classify(conversation_id: &ConversationId, outcome: StageOutcome) -> ResponseMessage {
    let kind = match outcome {
        StageOutcome::NoExpressions => ResponseKind::NoExpressions,
        StageOutcome::InstallFailed(package) => ResponseKind::InstallFailed { package },
        StageOutcome::Evaluated(EvaluationOutcome::Failed { diagnostic }) => {
            ResponseKind::EvalFailed { diagnostic }
        }
        StageOutcome::Evaluated(EvaluationOutcome::Values(mut values)) => match values.pop() {
            Some(value) => ResponseKind::Result { value },
            None => infrastructure(&EngineError::MalformedEvaluatorOutput(
                "no values returned".to_string(),
            )),
        },
        StageOutcome::Infrastructure(error) => infrastructure(&error),
    };

    ResponseMessage::new(conversation_id.clone(), kind)
}

/// Response for an infrastructure fault
pub fn infrastructure(error: &EngineError) -> ResponseKind {
    ResponseKind::InfrastructureError {
        message: error.user_hint().to_string(),
    }
}
