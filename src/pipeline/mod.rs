//! Request pipeline around the engine.
//!
//! A user request is turned into a prompt, the text generator answers with
//! DSL (bill, ride) or a JSON plan (event), the answer is turned into DSL
//! source, and the source is executed. Conference results are persisted
//! through a [`StateStore`] only when execution succeeded.

/// Conference plan JSON to DSL rendering.
pub mod assemble;
/// DSL candidate extraction from model output.
pub mod extract;
/// Text generation client.
pub mod generate;
/// Prompt templates.
pub mod prompt;

pub use assemble::{EventPlan, assemble_event_dsl};
pub use extract::extract_dsl;
pub use generate::{GenerationError, OllamaClient, ResponseFormat, TextGenerator};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domains::{BillInterpreter, DomainResult, EventInterpreter, RideInterpreter};
use crate::engine::{Domain, EngineError, GrammarSource, execute_domain};
use crate::store::{StateStore, StoreError};

/// Errors anywhere along a request
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Grammar, syntax, validation or role errors
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Conference state could not be loaded or saved
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The text generator failed
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// No DSL block could be found in the model's reply
    #[error("Could not find valid DSL code in the model's response. Full response: {0}")]
    NoDslFound(String),

    /// The model's conference plan was not usable
    #[error("invalid conference plan: {0}")]
    BadPlan(String),

    /// Conference requests must state who is asking
    #[error("a caller role is required for {0} requests")]
    MissingRole(Domain),
}

/// What a request produced, in the shape front ends print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RequestOutcome {
    /// The DSL ran.
    Success {
        /// DSL source that was executed
        llm_generated_dsl: String,
        /// Domain result
        interpreter_result: DomainResult,
    },
    /// Something failed; no domain result.
    Error {
        /// Error description
        message: String,
        /// Last DSL source assembled before the failure, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        llm_generated_dsl: Option<String>,
    },
}

impl RequestOutcome {
    /// Whether the request succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success { .. })
    }
}

/// Execute DSL source for `domain`.
///
/// For the event domain the state is loaded from `store` first and the new
/// state saved back only if the whole program succeeded. `role` is the
/// caller's role; see [`EventInterpreter::new`].
pub fn run_dsl<S: StateStore + ?Sized>(
    domain: Domain,
    dsl: &str,
    grammars: &GrammarSource,
    store: &S,
    role: Option<&str>,
) -> Result<DomainResult, PipelineError> {
    match domain {
        Domain::Bill => {
            let summary = execute_domain(dsl, domain, grammars, &mut BillInterpreter::new())?;
            Ok(summary.into())
        }
        Domain::Ride => {
            let plan = execute_domain(dsl, domain, grammars, &mut RideInterpreter::new())?;
            Ok(plan.into())
        }
        Domain::Event => {
            let loaded = store.load()?;
            let mut interpreter = EventInterpreter::new(&loaded.state, role);
            let outcome = execute_domain(dsl, domain, grammars, &mut interpreter)?;
            store.save(&outcome.new_state, &loaded.version)?;
            Ok(outcome.into())
        }
    }
}

/// Natural-language front door: prompt, generate, extract, execute.
pub struct Assistant<G, S> {
    generator: G,
    store: S,
    grammars: GrammarSource,
}

impl<G: TextGenerator, S: StateStore> Assistant<G, S> {
    /// Create an assistant.
    pub fn new(generator: G, store: S, grammars: GrammarSource) -> Self {
        Self {
            generator,
            store,
            grammars,
        }
    }

    /// The state store conference requests persist to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle one user request. Never fails; failures are reported in the
    /// outcome together with the DSL that was attempted.
    pub fn process(&self, domain: Domain, query: &str, role: Option<&str>) -> RequestOutcome {
        let span = tracing::info_span!("request", id = %Uuid::new_v4(), %domain);
        let _guard = span.enter();

        let mut dsl = None;
        match self.run(domain, query, role, &mut dsl) {
            Ok(interpreter_result) => RequestOutcome::Success {
                llm_generated_dsl: dsl.unwrap_or_default(),
                interpreter_result,
            },
            Err(err) => {
                tracing::warn!(error = %err, "request failed");
                RequestOutcome::Error {
                    message: err.to_string(),
                    llm_generated_dsl: dsl,
                }
            }
        }
    }

    fn run(
        &self,
        domain: Domain,
        query: &str,
        role: Option<&str>,
        dsl: &mut Option<String>,
    ) -> Result<DomainResult, PipelineError> {
        let prompt = prompt::prompt_for(domain, query);

        let source = match prompt::start_word(domain) {
            Some(word) => {
                let reply = self.generator.generate(&prompt, ResponseFormat::Text)?;
                extract_dsl(&reply, word).ok_or(PipelineError::NoDslFound(reply))?
            }
            None => {
                // The plan's role is the model's reading of the request and
                // never grants anything.
                let block_role = role.ok_or(PipelineError::MissingRole(domain))?;
                let reply = self.generator.generate(&prompt, ResponseFormat::Json)?;
                let plan: EventPlan =
                    serde_json::from_str(&reply).map_err(|err| PipelineError::BadPlan(err.to_string()))?;
                if let Some(claimed) = plan.role.as_deref().filter(|c| !c.eq_ignore_ascii_case(block_role)) {
                    tracing::debug!(claimed, role = block_role, "ignoring role claimed in plan");
                }
                assemble_event_dsl(&plan, block_role)
            }
        };

        tracing::debug!(dsl = %source, "assembled dsl");
        *dsl = Some(source);
        let source = dsl.as_deref().unwrap_or_default();
        run_dsl(domain, source, &self.grammars, &self.store, role)
    }
}
