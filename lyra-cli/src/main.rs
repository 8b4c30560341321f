mod manifest;

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use log::{debug, warn};

use lyra_core::context::Context;
use lyra_core::differ::{changed_attributes, create_plan};
use lyra_core::effect::Effect;
use lyra_core::interpreter::{ApplyResult, EffectOutcome, Interpreter};
use lyra_core::plan::Plan;
use lyra_core::provider::{Operation, Provider};
use lyra_core::resource::{Attributes, ResourceId, State, Value};
use lyra_core::schema::ResourceSchema;
use lyra_provider_aws::AwsProvider;
use lyra_provider_aws::schemas::all_schemas;
use lyra_state::{BackendConfig, StateBackend, StateFile, create_backend};

use manifest::Manifest;

#[derive(Parser)]
#[command(name = "lyra")]
#[command(about = "Declarative management of Cognito principal tags and IoT principal attachments", long_about = None)]
struct Cli {
    /// Path to the state file
    #[arg(long, global = true, default_value = "lyra.state.json")]
    state: PathBuf,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Give up on remote calls still running this many seconds after start
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the manifest
    Validate {
        /// Path to the JSON manifest
        #[arg(default_value = "lyra.json")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        #[arg(default_value = "lyra.json")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        #[arg(default_value = "lyra.json")]
        file: PathBuf,
    },
    /// Destroy all recorded resources declared in the manifest
    Destroy {
        #[arg(default_value = "lyra.json")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Adopt an existing remote resource into the state
    Import {
        /// Resource type, e.g. iot_thing_principal_attachment
        resource_type: String,
        /// Logical name to record the resource under
        name: String,
        /// Composite identifier of the remote resource
        identifier: String,
        #[arg(default_value = "lyra.json")]
        file: PathBuf,
    },
    /// Re-read every recorded resource and update the state
    Refresh {
        #[arg(default_value = "lyra.json")]
        file: PathBuf,
    },
    /// Release a state lock left behind by an interrupted run
    ForceUnlock {
        /// Id of the lock, as reported by the lock error
        lock_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut ctx = Context::new();
    if let Some(secs) = cli.timeout {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, cancelling in-flight operations...".yellow());
            interrupt.cancel();
        }
    });

    let state = cli.state;
    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&ctx, &file, &state).await,
        Commands::Apply { file } => run_apply(&ctx, &file, &state).await,
        Commands::Destroy { file, auto_approve } => {
            run_destroy(&ctx, &file, &state, auto_approve).await
        }
        Commands::Import {
            resource_type,
            name,
            identifier,
            file,
        } => {
            let id = ResourceId::new(resource_type, name);
            run_import(&ctx, &file, &state, &id, &identifier).await
        }
        Commands::Refresh { file } => run_refresh(&ctx, &file, &state).await,
        Commands::ForceUnlock { lock_id } => run_force_unlock(&state, &lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_validate(file: &Path) -> Result<(), String> {
    let manifest = Manifest::load(file)?;

    println!("{}", "Validating...".cyan());

    let resources = manifest.validate(&all_schemas())?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", resources.len())
            .green()
            .bold()
    );

    for resource in &resources {
        println!("  • {}", resource.id);
    }

    Ok(())
}

async fn run_plan(ctx: &Context, file: &Path, state_path: &Path) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    let schemas = all_schemas();
    let desired = manifest.validate(&schemas)?;

    let backend = open_backend(state_path)?;
    let interpreter = Interpreter::new(AwsProvider::new(&manifest.provider).await);

    // Planning never writes, so the state is refreshed in memory only
    let mut state = read_state(backend.as_ref()).await?;
    let current = refresh(ctx, &interpreter, &mut state).await?;

    let plan = create_plan(&schemas, &desired, &current);
    print_plan(&plan, &schemas);
    Ok(())
}

async fn run_apply(ctx: &Context, file: &Path, state_path: &Path) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    let schemas = all_schemas();
    let desired = manifest.validate(&schemas)?;

    let backend = open_backend(state_path)?;
    let backend = backend.as_ref();
    let interpreter = Interpreter::new(AwsProvider::new(&manifest.provider).await);

    with_lock(backend, "apply", async {
        let mut state = read_state(backend).await?;
        let current = refresh(ctx, &interpreter, &mut state).await?;

        let plan = create_plan(&schemas, &desired, &current);
        if plan.is_empty() {
            save_state(backend, &mut state).await?;
            println!("{}", "No changes needed.".green());
            return Ok(());
        }

        print_plan(&plan, &schemas);
        println!();
        println!("{}", "Applying changes...".cyan().bold());
        println!();

        let result = interpreter.apply(ctx, &plan).await;
        record_outcomes(&plan, &result, &mut state, interpreter.provider().name());
        save_state(backend, &mut state).await?;

        println!();
        if result.is_success() {
            println!(
                "{}",
                format!(
                    "Apply complete! {} changes applied.",
                    result.success_count
                )
                .green()
                .bold()
            );
            Ok(())
        } else {
            Err(format!(
                "Apply failed. {} succeeded, {} failed.",
                result.success_count, result.failure_count
            ))
        }
    })
    .await
}

async fn run_destroy(
    ctx: &Context,
    file: &Path,
    state_path: &Path,
    auto_approve: bool,
) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    manifest.provider.validate()?;
    let declared = manifest.resources()?;

    let backend = open_backend(state_path)?;
    let backend = backend.as_ref();
    let interpreter = Interpreter::new(AwsProvider::new(&manifest.provider).await);

    with_lock(backend, "destroy", async {
        let mut state = read_state(backend).await?;
        let current = refresh(ctx, &interpreter, &mut state).await?;

        // Every declared resource still recorded becomes an orphan of an empty manifest
        let doomed: HashMap<ResourceId, State> = current
            .into_iter()
            .filter(|(id, _)| declared.iter().any(|r| &r.id == id))
            .collect();
        let plan = create_plan(&[], &[], &doomed);

        if plan.is_empty() {
            save_state(backend, &mut state).await?;
            println!("{}", "No resources to destroy.".green());
            return Ok(());
        }

        println!("{}", "Destroy Plan:".red().bold());
        println!();
        for effect in plan.effects() {
            println!("  {} {}", "-".red().bold(), effect.resource_id());
        }
        println!();
        println!(
            "Plan: {} to destroy.",
            plan.mutation_count().to_string().red()
        );
        println!();

        if !auto_approve && !confirm_destroy()? {
            save_state(backend, &mut state).await?;
            println!();
            println!("{}", "Destroy cancelled.".yellow());
            return Ok(());
        }

        println!("{}", "Destroying resources...".red().bold());
        println!();

        let result = interpreter.apply(ctx, &plan).await;
        record_outcomes(&plan, &result, &mut state, interpreter.provider().name());
        save_state(backend, &mut state).await?;

        println!();
        if result.is_success() {
            println!(
                "{}",
                format!(
                    "Destroy complete! {} resources destroyed.",
                    result.success_count
                )
                .green()
                .bold()
            );
            Ok(())
        } else {
            Err(format!(
                "Destroy failed. {} succeeded, {} failed.",
                result.success_count, result.failure_count
            ))
        }
    })
    .await
}

async fn run_import(
    ctx: &Context,
    file: &Path,
    state_path: &Path,
    id: &ResourceId,
    identifier: &str,
) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    manifest.provider.validate()?;

    let backend = open_backend(state_path)?;
    let backend = backend.as_ref();
    let provider = AwsProvider::new(&manifest.provider).await;

    with_lock(backend, "import", async {
        let mut state = read_state(backend).await?;
        if let Some(existing) = state.find_resource(id) {
            return Err(format!(
                "{} is already managed (identifier {})",
                id, existing.identifier
            ));
        }

        let imported = provider
            .import(ctx, id, identifier)
            .await
            .map_err(|e| format!("Failed to import: {}", e))?;
        if !imported.exists {
            return Err(format!("No remote resource found for {}", identifier));
        }

        state.record(&imported, provider.name());
        save_state(backend, &mut state).await?;

        println!(
            "{} {}",
            "✓".green(),
            format!("Imported {} ({})", id, identifier).bold()
        );
        print_attributes(&imported.attributes, "    ");
        Ok(())
    })
    .await
}

async fn run_refresh(ctx: &Context, file: &Path, state_path: &Path) -> Result<(), String> {
    let manifest = Manifest::load(file)?;
    manifest.provider.validate()?;

    let backend = open_backend(state_path)?;
    let backend = backend.as_ref();
    let interpreter = Interpreter::new(AwsProvider::new(&manifest.provider).await);

    with_lock(backend, "refresh", async {
        let mut state = read_state(backend).await?;
        let before = state.resources.len();
        refresh(ctx, &interpreter, &mut state).await?;
        save_state(backend, &mut state).await?;

        let removed = before - state.resources.len();
        println!(
            "{}",
            format!(
                "Refresh complete! {} resources tracked, {} removed.",
                state.resources.len(),
                removed
            )
            .green()
            .bold()
        );
        Ok(())
    })
    .await
}

async fn run_force_unlock(state_path: &Path, lock_id: &str) -> Result<(), String> {
    let backend = open_backend(state_path)?;
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| format!("Failed to release lock {}: {}", lock_id, e))?;

    println!("{}", format!("Lock {} released.", lock_id).green().bold());
    Ok(())
}

fn open_backend(state_path: &Path) -> Result<Box<dyn StateBackend>, String> {
    create_backend(&BackendConfig::local(state_path.display().to_string()))
        .map_err(|e| e.to_string())
}

async fn read_state(backend: &dyn StateBackend) -> Result<StateFile, String> {
    let state = backend
        .read_state()
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;
    Ok(state.unwrap_or_default())
}

async fn save_state(backend: &dyn StateBackend, state: &mut StateFile) -> Result<(), String> {
    state.increment_serial();
    backend
        .write_state(state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))
}

/// Run `work` while holding the state lock. The lock is released even when
/// `work` fails.
async fn with_lock<T>(
    backend: &dyn StateBackend,
    operation: &str,
    work: impl Future<Output = Result<T, String>>,
) -> Result<T, String> {
    let lock = backend
        .acquire_lock(operation)
        .await
        .map_err(|e| format!("Failed to acquire state lock: {}", e))?;
    debug!("Acquired state lock {} for {}", lock.id, operation);

    let result = work.await;

    match backend.release_lock(&lock).await {
        Ok(()) => result,
        Err(e) if result.is_ok() => Err(format!("Failed to release state lock: {}", e)),
        Err(e) => {
            warn!("Failed to release state lock {}: {}", lock.id, e);
            result
        }
    }
}

/// Re-read every recorded resource, dropping the ones that vanished
async fn refresh<P: Provider>(
    ctx: &Context,
    interpreter: &Interpreter<P>,
    state: &mut StateFile,
) -> Result<HashMap<ResourceId, State>, String> {
    let mut plan = Plan::new();
    for record in &state.resources {
        plan.add(Effect::Read {
            id: record.id(),
            identifier: record.identifier.clone(),
        });
    }

    let result = interpreter.apply(ctx, &plan).await;
    let provider = interpreter.provider().name();
    for (effect, outcome) in plan.effects().iter().zip(result.outcomes) {
        match outcome {
            Ok(EffectOutcome::Read { state: current }) => {
                if !current.exists {
                    warn!("{} no longer exists, removing it from state", current.id);
                }
                state.record(&current, provider);
            }
            Ok(_) => {}
            Err(e) => return Err(format!("Failed to refresh {}: {}", effect.resource_id(), e)),
        }
    }
    Ok(state.current_states())
}

/// Fold the outcome of every executed effect into the state file and print it
fn record_outcomes(plan: &Plan, result: &ApplyResult, state: &mut StateFile, provider: &str) {
    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(EffectOutcome::Read { state: current })
            | Ok(EffectOutcome::Created { state: current })
            | Ok(EffectOutcome::Updated { state: current })
            | Ok(EffectOutcome::Replaced { state: current }) => {
                state.record(current, provider);
                println!("  {} {}", "✓".green(), format_effect(effect));
            }
            Ok(EffectOutcome::Deleted { id }) => {
                state.remove_resource(id);
                println!("  {} {}", "✓".green(), format_effect(effect));
            }
            Ok(EffectOutcome::Skipped { reason, .. }) => {
                println!("  {} {} ({})", "-".dimmed(), format_effect(effect), reason);
            }
            Err(e) => {
                // A replacement that failed on create has already deleted the old resource
                if let Effect::Replace { id, .. } = effect
                    && e.operation == Some(Operation::Create)
                {
                    state.remove_resource(id);
                }
                println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
            }
        }
    }

    for effect in plan.effects().iter().skip(result.outcomes.len()) {
        println!("  {} {} (not attempted)", "-".dimmed(), format_effect(effect));
    }
}

fn confirm_destroy() -> Result<bool, String> {
    println!(
        "{}",
        "Do you really want to destroy these resources?"
            .yellow()
            .bold()
    );
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;

    Ok(input.trim() == "yes")
}

fn print_plan(plan: &Plan, schemas: &[ResourceSchema]) {
    if plan.is_empty() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        match effect {
            Effect::Create(resource) => {
                println!("  {} {}", "+".green().bold(), resource.id.to_string().green());
                print_attributes(&resource.attributes, "      ");
            }
            Effect::Update { id, from, to } => {
                println!("  {} {}", "~".yellow().bold(), id.to_string().yellow());
                print_changes(schemas, from, &to.attributes);
            }
            Effect::Replace { id, from, to } => {
                println!(
                    "  {} {} {}",
                    "-/+".red().bold(),
                    id.to_string().red(),
                    "(forces replacement)".dimmed()
                );
                print_changes(schemas, from, &to.attributes);
            }
            Effect::Delete { id, identifier } => {
                println!(
                    "  {} {} {}",
                    "-".red().bold(),
                    id.to_string().red(),
                    format!("({})", identifier).dimmed()
                );
            }
            Effect::Read { .. } => {}
        }
    }

    println!();
    println!("{}", plan.summary());
}

fn print_changes(schemas: &[ResourceSchema], from: &State, desired: &Attributes) {
    let Some(schema) = schemas
        .iter()
        .find(|s| s.resource_type == from.id.resource_type)
    else {
        return;
    };

    let desired = schema.apply_defaults(desired);
    for name in changed_attributes(schema, &desired, &from.attributes) {
        let old = from
            .attributes
            .get(&name)
            .map(format_value)
            .unwrap_or_else(|| "(none)".to_string());
        let new = desired
            .get(&name)
            .map(format_value)
            .unwrap_or_else(|| "(none)".to_string());
        let marker = if schema.is_force_new(&name) {
            " # forces replacement".red().to_string()
        } else {
            String::new()
        };
        println!("      {}: {} → {}{}", name, old.red(), new.green(), marker);
    }
}

fn print_attributes(attributes: &Attributes, indent: &str) {
    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    for key in keys {
        println!("{}{}: {}", indent, key, format_value(&attributes[key]));
    }
}

fn format_effect(effect: &Effect) -> String {
    match effect {
        Effect::Create(r) => format!("Create {}", r.id),
        Effect::Update { id, .. } => format!("Update {}", id),
        Effect::Replace { id, .. } => format!("Replace {}", id),
        Effect::Delete { id, .. } => format!("Delete {}", id),
        Effect::Read { id, .. } => format!("Read {}", id),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let strs: Vec<_> = entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::provider::{BoxFuture, ErrorKind, ProviderError, ProviderResult};
    use lyra_core::resource::Resource;

    fn attachment(name: &str) -> State {
        let mut attrs = Attributes::new();
        attrs.insert("thing".to_string(), Value::String(name.to_string()));
        State::existing(ResourceId::new("iot_thing_principal_attachment", name), attrs)
            .with_identifier(format!("{}|arn:aws:iot:us-east-1:1:cert/ab", name))
    }

    /// Remote side holding the attachments named in `present`. Creates fail
    /// while reading the new resource back.
    struct FakeProvider {
        present: Vec<&'static str>,
    }

    impl Provider for FakeProvider {
        fn name(&self) -> &'static str {
            "aws"
        }

        fn schemas(&self) -> Vec<ResourceSchema> {
            all_schemas()
        }

        fn read(
            &self,
            _ctx: &Context,
            id: &ResourceId,
            identifier: &str,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let result = if identifier.starts_with("broken") {
                Err(ProviderError::new(ErrorKind::RemoteRejected, "access denied")
                    .during(Operation::Read)
                    .for_resource(id.clone()))
            } else if self.present.contains(&id.name.as_str()) {
                Ok(attachment(&id.name))
            } else {
                Ok(State::not_found(id.clone()))
            };
            Box::pin(async move { result })
        }

        fn create(&self, _ctx: &Context, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            let err = ProviderError::new(ErrorKind::RemoteRejected, "rate exceeded")
                .during(Operation::Read)
                .for_resource(resource.id.clone());
            Box::pin(async move { Err(err) })
        }

        fn update(
            &self,
            _ctx: &Context,
            _id: &ResourceId,
            _identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            let state = State::existing(to.id.clone(), to.attributes.clone());
            Box::pin(async move { Ok(state) })
        }

        fn delete(
            &self,
            _ctx: &Context,
            _id: &ResourceId,
            _identifier: &str,
        ) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
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
    async fn refresh_drops_vanished_records() {
        let interpreter = Interpreter::new(FakeProvider { present: vec!["a"] });
        let mut state = StateFile::new();
        state.record(&attachment("a"), "aws");
        state.record(&attachment("b"), "aws");

        let current = refresh(&Context::new(), &interpreter, &mut state).await.unwrap();

        assert_eq!(current.len(), 1);
        assert_eq!(current.get(&attachment("a").id), Some(&attachment("a")));
        assert!(state.find_resource(&attachment("b").id).is_none());
    }

    #[tokio::test]
    async fn refresh_failure_keeps_records() {
        let interpreter = Interpreter::new(FakeProvider { present: vec!["a"] });
        let broken = attachment("a").with_identifier("broken|arn:aws:iot:us-east-1:1:cert/ab");
        let mut state = StateFile::new();
        state.record(&broken, "aws");

        let err = refresh(&Context::new(), &interpreter, &mut state)
            .await
            .unwrap_err();

        assert!(err.contains("iot_thing_principal_attachment.a"));
        assert!(state.find_resource(&broken.id).is_some());
    }

    #[tokio::test]
    async fn replacement_failing_after_delete_drops_record() {
        let old = attachment("a");
        let mut state = StateFile::new();
        state.record(&old, "aws");

        let mut plan = Plan::new();
        plan.add(Effect::Replace {
            id: old.id.clone(),
            from: old.clone(),
            to: Resource::new("iot_thing_principal_attachment", "a"),
        });

        let interpreter = Interpreter::new(FakeProvider { present: vec![] });
        let result = interpreter.apply(&Context::new(), &plan).await;
        assert_eq!(result.failure_count, 1);

        record_outcomes(&plan, &result, &mut state, "aws");
        assert!(state.find_resource(&old.id).is_none());
    }

    #[test]
    fn parses_timeout_and_force_unlock() {
        let cli = Cli::try_parse_from(["lyra", "--timeout", "30", "force-unlock", "abc-123"]).unwrap();
        assert_eq!(cli.timeout, Some(30));
        match cli.command {
            Commands::ForceUnlock { lock_id } => assert_eq!(lock_id, "abc-123"),
            _ => panic!("Expected force-unlock"),
        }

        let cli = Cli::try_parse_from(["lyra", "plan", "site.json"]).unwrap();
        assert_eq!(cli.timeout, None);
    }

    #[test]
    fn format_value_sorts_map_keys() {
        let value = Value::string_map([("team", "iot"), ("dept", "eng")]);
        assert_eq!(format_value(&value), "{dept: \"eng\", team: \"iot\"}");
        assert_eq!(
            format_value(&Value::List(vec![Value::Int(1), Value::Bool(true)])),
            "[1, true]"
        );
    }

    #[test]
    fn outcomes_are_recorded_in_state() {
        let created = attachment("a");
        let deleted = attachment("b");

        let mut state = StateFile::new();
        state.record(&deleted, "aws");

        let mut plan = Plan::new();
        plan.add(Effect::Create(Resource::new("iot_thing_principal_attachment", "a")));
        plan.add(Effect::Delete {
            id: deleted.id.clone(),
            identifier: deleted.identifier.clone().unwrap(),
        });

        let result = ApplyResult {
            outcomes: vec![
                Ok(EffectOutcome::Created {
                    state: created.clone(),
                }),
                Ok(EffectOutcome::Deleted {
                    id: deleted.id.clone(),
                }),
            ],
            success_count: 2,
            failure_count: 0,
        };

        record_outcomes(&plan, &result, &mut state, "aws");
        let current = state.current_states();
        assert_eq!(current.get(&created.id), Some(&created));
        assert!(!current.contains_key(&deleted.id));
    }

    #[test]
    fn failed_replacement_drops_deleted_record() {
        let old = attachment("a");
        let mut state = StateFile::new();
        state.record(&old, "aws");

        let mut plan = Plan::new();
        plan.add(Effect::Replace {
            id: old.id.clone(),
            from: old.clone(),
            to: Resource::new("iot_thing_principal_attachment", "a"),
        });

        let result = ApplyResult {
            outcomes: vec![Err(ProviderError::new(ErrorKind::RemoteRejected, "denied")
                .during(Operation::Create)
                .for_resource(old.id.clone()))],
            success_count: 0,
            failure_count: 1,
        };

        record_outcomes(&plan, &result, &mut state, "aws");
        assert!(state.find_resource(&old.id).is_none());
    }

    #[test]
    fn failed_update_keeps_previous_record() {
        let old = attachment("a");
        let mut state = StateFile::new();
        state.record(&old, "aws");

        let mut plan = Plan::new();
        plan.add(Effect::Update {
            id: old.id.clone(),
            from: old.clone(),
            to: Resource::new("iot_thing_principal_attachment", "a"),
        });

        let result = ApplyResult {
            outcomes: vec![Err(ProviderError::new(ErrorKind::RemoteRejected, "denied")
                .during(Operation::Update))],
            success_count: 0,
            failure_count: 1,
        };

        record_outcomes(&plan, &result, &mut state, "aws");
        assert_eq!(state.current_states().get(&old.id), Some(&old));
    }
}
