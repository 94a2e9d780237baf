//! The phased receive pipeline.
//!
//! A [`ReceivePipeline`] is an ordered table of three phases. Each phase holds
//! steps in insertion order:
//!
//! | Phase | Purpose | Finish-early |
//! |-------|---------|--------------|
//! | [`ReceivePhase::Before`] | Prepare the candidate (e.g. substitute a cached body) | no, every step runs |
//! | [`ReceivePhase::Transform`] | Convert the candidate toward the requested type | yes, skipped once the candidate has the requested type |
//! | [`ReceivePhase::After`] | Observe or post-process the final candidate | no, every step runs |
//!
//! Any step may end the whole pipeline by returning [`StepOutcome::Finish`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use tracing::{debug, trace};

use crate::{Attributes, CallId, ReceiveConfig, ReceiveError, ReceiveRequest};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Named, ordered stages of the receive pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReceivePhase {
    Before,
    Transform,
    After,
}

impl ReceivePhase {
    /// All phases in execution order.
    pub const ALL: [ReceivePhase; 3] = [ReceivePhase::Before, ReceivePhase::Transform, ReceivePhase::After];

    pub fn name(self) -> &'static str {
        match self {
            ReceivePhase::Before => "Before",
            ReceivePhase::Transform => "Transform",
            ReceivePhase::After => "After",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ReceivePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// What a step wants the executor to do next.
#[derive(Debug)]
pub enum StepOutcome {
    /// Hand the request to the next step.
    Proceed(ReceiveRequest),
    /// Stop the pipeline; the request is final.
    Finish(ReceiveRequest),
}

/// Per-call view handed to every step.
pub struct ReceiveContext<'a> {
    pub call_id: CallId,
    pub headers: &'a HeaderMap,
    pub attributes: &'a mut Attributes,
    /// Settings of the pipeline running this receive.
    pub config: &'a ReceiveConfig,
}

/// One pluggable transformation in a [`ReceivePipeline`].
///
/// A step receives the request by value and returns a request, possibly with a
/// new candidate value. Steps may suspend while awaiting body bytes.
#[async_trait]
pub trait ReceiveStep: Send + Sync {
    /// Name used in log events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    async fn process(
        &self,
        context: &mut ReceiveContext<'_>,
        request: ReceiveRequest,
    ) -> Result<StepOutcome, ReceiveError>;
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Ordered stage table of receive steps, shared by every call of an application.
#[derive(Default, Clone)]
pub struct ReceivePipeline {
    phases: [Vec<Arc<dyn ReceiveStep>>; 3],
    config: ReceiveConfig,
}

impl ReceivePipeline {
    /// A pipeline with no steps: only values that already have the requested
    /// type (the raw [`crate::ByteReadChannel`]) can be received.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pipeline with [`crate::DefaultTransform`] installed in the Transform
    /// phase. `config` is also exposed to every step through
    /// [`ReceiveContext::config`].
    pub fn with_defaults(config: ReceiveConfig) -> Self {
        let mut pipeline = Self {
            config: config.clone(),
            ..Self::default()
        };
        pipeline.intercept(ReceivePhase::Transform, crate::DefaultTransform::new(config));
        pipeline
    }

    pub fn config(&self) -> &ReceiveConfig {
        &self.config
    }

    /// Appends `step` to `phase`.
    pub fn intercept(&mut self, phase: ReceivePhase, step: impl ReceiveStep + 'static) -> &mut Self {
        self.phases[phase.index()].push(Arc::new(step));
        self
    }

    /// Inserts `step` at the front of `phase`.
    pub fn intercept_first(&mut self, phase: ReceivePhase, step: impl ReceiveStep + 'static) -> &mut Self {
        self.phases[phase.index()].insert(0, Arc::new(step));
        self
    }

    pub fn steps(&self, phase: ReceivePhase) -> &[Arc<dyn ReceiveStep>] {
        &self.phases[phase.index()]
    }

    /// Runs `request` through every phase and returns the final request.
    ///
    /// The first step error aborts execution and is returned unchanged.
    pub async fn execute(
        &self,
        context: &mut ReceiveContext<'_>,
        mut request: ReceiveRequest,
    ) -> Result<ReceiveRequest, ReceiveError> {
        for phase in ReceivePhase::ALL {
            for step in self.steps(phase) {
                if phase == ReceivePhase::Transform && request.is_complete() {
                    trace!(call_id = %context.call_id, %phase, "candidate complete, skipping remaining transformations");
                    break;
                }
                debug!(
                    call_id = %context.call_id,
                    %phase,
                    step = step.name(),
                    requested = %request.type_info(),
                    "running receive step"
                );
                match step.process(context, request).await? {
                    StepOutcome::Proceed(next) => request = next,
                    StepOutcome::Finish(last) => {
                        debug!(call_id = %context.call_id, %phase, step = step.name(), "receive pipeline finished early");
                        return Ok(last);
                    }
                }
            }
        }
        Ok(request)
    }
}

impl fmt::Debug for ReceivePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for phase in ReceivePhase::ALL {
            let names: Vec<_> = self.steps(phase).iter().map(|s| s.name()).collect();
            map.entry(&phase.name(), &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::TypeInfo;

    /// Records its label and optionally replaces the candidate.
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        produce: Option<String>,
        finish: bool,
    }

    impl Recorder {
        fn new(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
            Self {
                label,
                log: Arc::clone(log),
                produce: None,
                finish: false,
            }
        }
    }

    #[async_trait]
    impl ReceiveStep for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn process(
            &self,
            _context: &mut ReceiveContext<'_>,
            request: ReceiveRequest,
        ) -> Result<StepOutcome, ReceiveError> {
            self.log.lock().unwrap().push(self.label);
            let request = match &self.produce {
                Some(value) => request.with_value(value.clone(), true),
                None => request,
            };
            Ok(if self.finish {
                StepOutcome::Finish(request)
            } else {
                StepOutcome::Proceed(request)
            })
        }
    }

    async fn run(pipeline: &ReceivePipeline, request: ReceiveRequest) -> ReceiveRequest {
        let headers = HeaderMap::new();
        let mut attributes = Attributes::new();
        let mut context = ReceiveContext {
            call_id: CallId::new_random(),
            headers: &headers,
            attributes: &mut attributes,
            config: pipeline.config(),
        };
        pipeline.execute(&mut context, request).await.unwrap()
    }

    fn pending_string_request() -> ReceiveRequest {
        ReceiveRequest::new(TypeInfo::of::<String>(), Some(Box::new(0u8)), false)
    }

    #[tokio::test]
    async fn phases_run_in_order_regardless_of_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = ReceivePipeline::new();
        pipeline
            .intercept(ReceivePhase::After, Recorder::new("after", &log))
            .intercept(ReceivePhase::Transform, Recorder::new("transform-1", &log))
            .intercept(ReceivePhase::Before, Recorder::new("before", &log))
            .intercept(ReceivePhase::Transform, Recorder::new("transform-2", &log))
            .intercept_first(ReceivePhase::Transform, Recorder::new("transform-0", &log));

        run(&pipeline, pending_string_request()).await;
        assert_eq!(
            *log.lock().unwrap(),
            ["before", "transform-0", "transform-1", "transform-2", "after"]
        );
    }

    #[tokio::test]
    async fn transform_phase_stops_once_candidate_is_complete() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut producer = Recorder::new("producer", &log);
        producer.produce = Some("done".to_string());
        let mut pipeline = ReceivePipeline::new();
        pipeline
            .intercept(ReceivePhase::Transform, producer)
            .intercept(ReceivePhase::Transform, Recorder::new("skipped", &log))
            .intercept(ReceivePhase::After, Recorder::new("after", &log));

        let request = run(&pipeline, pending_string_request()).await;
        assert!(request.is_complete());
        assert_eq!(*log.lock().unwrap(), ["producer", "after"]);
    }

    #[tokio::test]
    async fn finish_ends_every_phase() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut finisher = Recorder::new("finisher", &log);
        finisher.finish = true;
        let mut pipeline = ReceivePipeline::new();
        pipeline
            .intercept(ReceivePhase::Before, finisher)
            .intercept(ReceivePhase::Transform, Recorder::new("transform", &log))
            .intercept(ReceivePhase::After, Recorder::new("after", &log));

        run(&pipeline, pending_string_request()).await;
        assert_eq!(*log.lock().unwrap(), ["finisher"]);
    }

    #[tokio::test]
    async fn before_steps_run_even_when_already_complete() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = ReceivePipeline::new();
        pipeline
            .intercept(ReceivePhase::Before, Recorder::new("before", &log))
            .intercept(ReceivePhase::Transform, Recorder::new("transform", &log));

        let request = ReceiveRequest::new(TypeInfo::of::<String>(), Some(Box::new(String::new())), true);
        run(&pipeline, request).await;
        assert_eq!(*log.lock().unwrap(), ["before"]);
    }

    #[test]
    fn debug_lists_steps_per_phase() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = ReceivePipeline::new();
        pipeline.intercept(ReceivePhase::After, Recorder::new("audit", &log));
        let rendered = format!("{pipeline:?}");
        assert!(rendered.contains("\"After\": [\"audit\"]"), "{rendered}");
    }
}
