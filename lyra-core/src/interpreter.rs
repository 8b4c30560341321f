//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. This is where side effects actually occur.

use log::info;

use crate::context::Context;
use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{ErrorKind, Operation, Provider, ProviderError, ProviderResult};
use crate::resource::{ResourceId, State};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Read succeeded; `state.exists` is false when the resource vanished
    Read { state: State },
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Delete and re-create succeeded
    Replaced { state: State },
    /// Delete succeeded
    Deleted { id: ResourceId },
    /// Skipped (e.g., dry-run)
    Skipped { id: ResourceId, reason: String },
}

/// Result of executing the entire Plan
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute a Plan, interpreting all Effects and causing side effects.
    ///
    /// Cancellation always stops the run, even with `continue_on_error`.
    pub async fn apply(&self, ctx: &Context, plan: &Plan) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            let result = self.execute_effect(ctx, effect).await;

            let stop = match &result {
                Ok(_) => {
                    success_count += 1;
                    false
                }
                Err(e) => {
                    failure_count += 1;
                    e.is_cancelled() || !self.config.continue_on_error
                }
            };

            outcomes.push(result);
            if stop {
                break;
            }
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    async fn execute_effect(&self, ctx: &Context, effect: &Effect) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                id: effect.resource_id().clone(),
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Read { id, identifier } => {
                let state = self.provider.read(ctx, id, identifier).await?;
                Ok(EffectOutcome::Read { state })
            }
            Effect::Create(resource) => {
                let state = self.provider.create(ctx, resource).await?;
                info!("Created {}", resource.id);
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { id, from, to } => {
                let identifier = recorded_identifier(id, from)?;
                let state = self
                    .provider
                    .update(ctx, id, identifier, from, to)
                    .await?;
                info!("Updated {}", id);
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Replace { id, from, to } => {
                let identifier = recorded_identifier(id, from)?;
                // A failure after the delete is reported as a failed Create
                self.provider
                    .delete(ctx, id, identifier)
                    .await
                    .map_err(|e| e.during(Operation::Delete))?;
                let state = self
                    .provider
                    .create(ctx, to)
                    .await
                    .map_err(|e| e.during(Operation::Create))?;
                info!("Replaced {}", id);
                Ok(EffectOutcome::Replaced { state })
            }
            Effect::Delete { id, identifier } => {
                self.provider.delete(ctx, id, identifier).await?;
                info!("Deleted {}", id);
                Ok(EffectOutcome::Deleted { id: id.clone() })
            }
        }
    }
}

fn recorded_identifier<'a>(id: &ResourceId, state: &'a State) -> ProviderResult<&'a str> {
    state.identifier.as_deref().ok_or_else(|| {
        ProviderError::new(
            ErrorKind::MalformedIdentifier,
            "no identifier recorded for resource",
        )
        .for_resource(id.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::provider::BoxFuture;
    use crate::resource::Resource;
    use crate::schema::ResourceSchema;

    #[derive(Default)]
    struct TestProvider {
        calls: Mutex<Vec<String>>,
        fail_create_read_back: bool,
    }

    impl TestProvider {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Provider for TestProvider {
        fn name(&self) -> &'static str {
            "test"
        }

        fn schemas(&self) -> Vec<ResourceSchema> {
            vec![]
        }

        fn read(
            &self,
            _ctx: &Context,
            id: &ResourceId,
            identifier: &str,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            self.record(format!("read {}", identifier));
            let id = id.clone();
            Box::pin(async move { Ok(State::not_found(id)) })
        }

        fn create(&self, _ctx: &Context, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            self.record(format!("create {}", resource.id));
            if self.fail_create_read_back {
                let err = ProviderError::new(ErrorKind::RemoteRejected, "rate exceeded")
                    .during(Operation::Read)
                    .for_resource(resource.id.clone());
                return Box::pin(async move { Err(err) });
            }
            let state = State::existing(resource.id.clone(), resource.attributes.clone())
                .with_identifier("test-id");
            Box::pin(async move { Ok(state) })
        }

        fn update(
            &self,
            _ctx: &Context,
            id: &ResourceId,
            identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            self.record(format!("update {}", identifier));
            let state = State::existing(id.clone(), to.attributes.clone()).with_identifier(identifier);
            Box::pin(async move { Ok(state) })
        }

        fn delete(
            &self,
            ctx: &Context,
            id: &ResourceId,
            identifier: &str,
        ) -> BoxFuture<'_, ProviderResult<()>> {
            self.record(format!("delete {}", identifier));
            let cancelled = ctx.is_cancelled();
            let id = id.clone();
            Box::pin(async move {
                if cancelled {
                    Err(ProviderError::new(ErrorKind::OperationCancelled, "operation cancelled")
                        .for_resource(id))
                } else {
                    Ok(())
                }
            })
        }

        fn import(
            &self,
            ctx: &Context,
            id: &ResourceId,
            identifier: &str,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            self.read(ctx, id, identifier)
        }
    }

    #[tokio::test]
    async fn apply_empty_plan() {
        let interpreter = Interpreter::new(TestProvider::default());
        let plan = Plan::new();
        let result = interpreter.apply(&Context::new(), &plan).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 0);
    }

    #[tokio::test]
    async fn apply_create_effect() {
        let interpreter = Interpreter::new(TestProvider::default());
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "example")));

        let result = interpreter.apply(&Context::new(), &plan).await;

        assert!(result.is_success());
        assert_eq!(result.success_count, 1);
        match &result.outcomes[0] {
            Ok(EffectOutcome::Created { state }) => {
                assert_eq!(state.identifier.as_deref(), Some("test-id"))
            }
            other => panic!("Expected Created, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn replace_deletes_then_creates() {
        let interpreter = Interpreter::new(TestProvider::default());
        let id = ResourceId::new("test", "example");
        let mut plan = Plan::new();
        plan.add(Effect::Replace {
            id: id.clone(),
            from: State::existing(id.clone(), Default::default()).with_identifier("old-id"),
            to: Resource::new("test", "example"),
        });

        let result = interpreter.apply(&Context::new(), &plan).await;

        assert!(result.is_success());
        assert_eq!(
            *interpreter.provider().calls.lock().unwrap(),
            vec!["delete old-id".to_string(), "create test.example".to_string()]
        );
    }

    #[tokio::test]
    async fn replace_create_failure_after_delete_is_tagged_create() {
        let provider = TestProvider {
            fail_create_read_back: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(provider);
        let id = ResourceId::new("test", "example");
        let mut plan = Plan::new();
        plan.add(Effect::Replace {
            id: id.clone(),
            from: State::existing(id.clone(), Default::default()).with_identifier("old-id"),
            to: Resource::new("test", "example"),
        });

        let result = interpreter.apply(&Context::new(), &plan).await;

        assert_eq!(result.failure_count, 1);
        match &result.outcomes[0] {
            Err(e) => {
                assert_eq!(e.kind, ErrorKind::RemoteRejected);
                assert_eq!(e.operation, Some(Operation::Create));
            }
            other => panic!("Expected failure, got {:?}", other),
        }
        assert_eq!(
            *interpreter.provider().calls.lock().unwrap(),
            vec!["delete old-id".to_string(), "create test.example".to_string()]
        );
    }

    #[tokio::test]
    async fn read_effect_reports_state() {
        let interpreter = Interpreter::new(TestProvider::default());
        let mut plan = Plan::new();
        plan.add(Effect::Read {
            id: ResourceId::new("test", "example"),
            identifier: "abc".to_string(),
        });

        let result = interpreter.apply(&Context::new(), &plan).await;

        assert!(result.is_success());
        match &result.outcomes[0] {
            Ok(EffectOutcome::Read { state }) => assert!(!state.exists),
            other => panic!("Expected Read, got {:?}", other),
        }
        assert_eq!(*interpreter.provider().calls.lock().unwrap(), vec!["read abc".to_string()]);
    }

    #[tokio::test]
    async fn update_without_identifier_fails() {
        let interpreter = Interpreter::new(TestProvider::default());
        let id = ResourceId::new("test", "example");
        let mut plan = Plan::new();
        plan.add(Effect::Update {
            id: id.clone(),
            from: State::existing(id.clone(), Default::default()),
            to: Resource::new("test", "example"),
        });

        let result = interpreter.apply(&Context::new(), &plan).await;
        assert_eq!(result.failure_count, 1);
        assert!(interpreter.provider().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_even_when_continuing_on_error() {
        let config = InterpreterConfig {
            continue_on_error: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(TestProvider::default()).with_config(config);
        let mut plan = Plan::new();
        for name in ["a", "b"] {
            plan.add(Effect::Delete {
                id: ResourceId::new("test", name),
                identifier: format!("{}-id", name),
            });
        }

        let ctx = Context::new();
        ctx.cancel();
        let result = interpreter.apply(&ctx, &plan).await;

        assert_eq!(result.failure_count, 1);
        assert_eq!(result.outcomes.len(), 1);
    }

    #[tokio::test]
    async fn dry_run_skips_effects() {
        let config = InterpreterConfig {
            dry_run: true,
            ..Default::default()
        };
        let interpreter = Interpreter::new(TestProvider::default()).with_config(config);
        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("test", "example")));

        let result = interpreter.apply(&Context::new(), &plan).await;

        assert!(result.is_success());
        assert!(matches!(
            result.outcomes[0],
            Ok(EffectOutcome::Skipped { .. })
        ));
        assert!(interpreter.provider().calls.lock().unwrap().is_empty());
    }
}
