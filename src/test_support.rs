//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ffi::OsString;
use std::future::ready;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};

use crate::command::{CommandError, CommandOutput, CommandRunner};
use crate::compute::{
    AcceleratorType, ComputeApi, ComputeError, ComputeFuture, InstanceSummary, Operation,
    OperationErrorDetail, OperationStatus,
};
use crate::instance::InstanceSpec;

/// How the fake reacts to an `insertInstance` call in a zone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InsertBehaviour {
    /// The instance is created and the operation finishes cleanly.
    Succeed,
    /// The instance is created but the operation finishes with `code`,
    /// leaving a half-provisioned resource behind.
    FailLeavingInstance(String),
    /// The operation finishes with `code` and no instance is created.
    FailWithoutInstance(String),
    /// The insert call itself is rejected by the provider.
    Reject(String),
}

/// A call recorded by [`FakeCompute`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ComputeCall {
    /// `listZones`.
    ListZones,
    /// `listAcceleratorTypes` for a zone.
    ListAcceleratorTypes(String),
    /// `listInstances` for a zone.
    ListInstances(String),
    /// `getInstance` for a zone and name.
    GetInstance(String, String),
    /// `insertInstance` for a zone and name.
    InsertInstance(String, String),
    /// `deleteInstance` for a zone and name.
    DeleteInstance(String, String),
    /// `getOperation` for a zone and operation name.
    GetOperation(String, String),
}

#[derive(Debug)]
struct PendingOperation {
    remaining_polls: u32,
    errors: Vec<OperationErrorDetail>,
}

#[derive(Debug, Default)]
struct State {
    zones: Vec<String>,
    accelerators: HashMap<String, Vec<String>>,
    instances: BTreeMap<String, Vec<String>>,
    inserts: HashMap<String, InsertBehaviour>,
    failing_deletes: HashSet<String>,
    failing_accelerator_zones: HashSet<String>,
    failing_instance_list_zones: HashSet<String>,
    fail_zone_listing: bool,
    transient_get_failures: u32,
    operation_poll_failures: u32,
    polls_before_done: u32,
    operations: HashMap<String, PendingOperation>,
    next_operation: u32,
    calls: Vec<ComputeCall>,
    inserted_specs: Vec<InstanceSpec>,
}

impl State {
    fn start_operation(&mut self, errors: Vec<OperationErrorDetail>) -> Operation {
        self.next_operation += 1;
        let name = format!("operation-{}", self.next_operation);
        let status = if self.polls_before_done == 0 {
            OperationStatus::Done
        } else {
            OperationStatus::Running
        };
        let operation = Operation {
            name: name.clone(),
            status,
            errors: if self.polls_before_done == 0 {
                errors.clone()
            } else {
                Vec::new()
            },
        };
        self.operations.insert(
            name,
            PendingOperation {
                remaining_polls: self.polls_before_done,
                errors,
            },
        );
        operation
    }

    fn zone_instances(&mut self, zone: &str) -> &mut Vec<String> {
        self.instances.entry(zone.to_owned()).or_default()
    }

    fn has_instance(&self, zone: &str, name: &str) -> bool {
        self.instances
            .get(zone)
            .is_some_and(|names| names.iter().any(|candidate| candidate == name))
    }
}

fn failure(code: &str) -> Vec<OperationErrorDetail> {
    vec![OperationErrorDetail {
        code: code.to_owned(),
        message: Some(format!("simulated {code}")),
    }]
}

fn provider_error(message: &str) -> ComputeError {
    ComputeError::Provider {
        status: Some(503),
        message: message.to_owned(),
    }
}

/// In-memory compute provider with scriptable failures.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the other afterwards.
#[derive(Clone, Debug, Default)]
pub struct FakeCompute {
    state: Arc<Mutex<State>>,
}

impl FakeCompute {
    /// Creates a provider with the given zones and no accelerators.
    #[must_use]
    pub fn with_zones(zones: &[&str]) -> Self {
        let fake = Self::default();
        fake.with_state(|state| {
            state.zones = zones.iter().map(|zone| (*zone).to_owned()).collect();
        });
        fake
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Lists accelerator types as offered in `zone`.
    pub fn offer_accelerators(&self, zone: &str, names: &[&str]) {
        self.with_state(|state| {
            state.accelerators.insert(
                zone.to_owned(),
                names.iter().map(|name| (*name).to_owned()).collect(),
            );
        });
    }

    /// Sets the outcome of inserts in `zone`; the default is success.
    pub fn script_insert(&self, zone: &str, behaviour: InsertBehaviour) {
        self.with_state(|state| {
            state.inserts.insert(zone.to_owned(), behaviour);
        });
    }

    /// Places an existing instance in `zone`.
    pub fn add_instance(&self, zone: &str, name: &str) {
        self.with_state(|state| state.zone_instances(zone).push(name.to_owned()));
    }

    /// Makes delete operations for `name` finish with an error.
    pub fn fail_delete_of(&self, name: &str) {
        self.with_state(|state| {
            state.failing_deletes.insert(name.to_owned());
        });
    }

    /// Makes accelerator listing fail in `zone`.
    pub fn fail_accelerator_listing(&self, zone: &str) {
        self.with_state(|state| {
            state.failing_accelerator_zones.insert(zone.to_owned());
        });
    }

    /// Makes instance listing fail in `zone`.
    pub fn fail_instance_listing(&self, zone: &str) {
        self.with_state(|state| {
            state.failing_instance_list_zones.insert(zone.to_owned());
        });
    }

    /// Makes zone enumeration fail.
    pub fn fail_zone_listing(&self) {
        self.with_state(|state| state.fail_zone_listing = true);
    }

    /// Makes the next `count` instance lookups fail with a transient error.
    pub fn fail_next_instance_lookups(&self, count: u32) {
        self.with_state(|state| state.transient_get_failures = count);
    }

    /// Makes the next `count` operation polls fail.
    pub fn fail_next_operation_polls(&self, count: u32) {
        self.with_state(|state| state.operation_poll_failures = count);
    }

    /// Keeps new operations running for `polls` polls before they finish.
    pub fn finish_operations_after(&self, polls: u32) {
        self.with_state(|state| state.polls_before_done = polls);
    }

    /// Names of the instances currently present in `zone`.
    #[must_use]
    pub fn instances_in(&self, zone: &str) -> Vec<String> {
        self.with_state(|state| state.instances.get(zone).cloned().unwrap_or_default())
    }

    /// Total number of instances across all zones.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.with_state(|state| state.instances.values().map(Vec::len).sum())
    }

    /// Snapshot of every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ComputeCall> {
        self.with_state(|state| state.calls.clone())
    }

    /// Specifications submitted through `insertInstance`, in order.
    #[must_use]
    pub fn inserted_specs(&self) -> Vec<InstanceSpec> {
        self.with_state(|state| state.inserted_specs.clone())
    }

    /// Zones whose accelerator listing was queried, in order.
    #[must_use]
    pub fn scanned_zones(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ComputeCall::ListAcceleratorTypes(zone) => Some(zone),
                _ => None,
            })
            .collect()
    }

    /// Number of mutating calls (inserts and deletes) made so far.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    ComputeCall::InsertInstance(..) | ComputeCall::DeleteInstance(..)
                )
            })
            .count()
    }
}

impl ComputeApi for FakeCompute {
    fn list_zones<'a>(&'a self, _project: &'a str) -> ComputeFuture<'a, Vec<String>> {
        let result = self.with_state(|state| {
            state.calls.push(ComputeCall::ListZones);
            if state.fail_zone_listing {
                return Err(ComputeError::Provider {
                    status: Some(403),
                    message: String::from("simulated permission denied"),
                });
            }
            Ok(state.zones.clone())
        });
        Box::pin(ready(result))
    }

    fn list_accelerator_types<'a>(
        &'a self,
        _project: &'a str,
        zone: &'a str,
    ) -> ComputeFuture<'a, Vec<AcceleratorType>> {
        let result = self.with_state(|state| {
            state
                .calls
                .push(ComputeCall::ListAcceleratorTypes(zone.to_owned()));
            if state.failing_accelerator_zones.contains(zone) {
                return Err(provider_error("simulated accelerator listing failure"));
            }
            Ok(state
                .accelerators
                .get(zone)
                .map(|names| names.iter().map(AcceleratorType::new).collect())
                .unwrap_or_default())
        });
        Box::pin(ready(result))
    }

    fn list_instances<'a>(
        &'a self,
        _project: &'a str,
        zone: &'a str,
    ) -> ComputeFuture<'a, Vec<InstanceSummary>> {
        let result = self.with_state(|state| {
            state.calls.push(ComputeCall::ListInstances(zone.to_owned()));
            if state.failing_instance_list_zones.contains(zone) {
                return Err(provider_error("simulated instance listing failure"));
            }
            Ok(state
                .instances
                .get(zone)
                .map(|names| {
                    names
                        .iter()
                        .map(|name| InstanceSummary {
                            name: name.clone(),
                            status: Some(String::from("RUNNING")),
                        })
                        .collect()
                })
                .unwrap_or_default())
        });
        Box::pin(ready(result))
    }

    fn get_instance<'a>(
        &'a self,
        _project: &'a str,
        zone: &'a str,
        name: &'a str,
    ) -> ComputeFuture<'a, InstanceSummary> {
        let result = self.with_state(|state| {
            state
                .calls
                .push(ComputeCall::GetInstance(zone.to_owned(), name.to_owned()));
            if state.transient_get_failures > 0 {
                state.transient_get_failures -= 1;
                return Err(provider_error("simulated lookup failure"));
            }
            if state.has_instance(zone, name) {
                Ok(InstanceSummary {
                    name: name.to_owned(),
                    status: Some(String::from("RUNNING")),
                })
            } else {
                Err(ComputeError::NotFound {
                    resource: format!("zones/{zone}/instances/{name}"),
                })
            }
        });
        Box::pin(ready(result))
    }

    fn insert_instance<'a>(
        &'a self,
        _project: &'a str,
        zone: &'a str,
        spec: &'a InstanceSpec,
    ) -> ComputeFuture<'a, Operation> {
        let result = self.with_state(|state| {
            state.calls.push(ComputeCall::InsertInstance(
                zone.to_owned(),
                spec.name.clone(),
            ));
            state.inserted_specs.push(spec.clone());
            let behaviour = state
                .inserts
                .get(zone)
                .cloned()
                .unwrap_or(InsertBehaviour::Succeed);
            match behaviour {
                InsertBehaviour::Succeed => {
                    state.zone_instances(zone).push(spec.name.clone());
                    Ok(state.start_operation(Vec::new()))
                }
                InsertBehaviour::FailLeavingInstance(code) => {
                    state.zone_instances(zone).push(spec.name.clone());
                    Ok(state.start_operation(failure(&code)))
                }
                InsertBehaviour::FailWithoutInstance(code) => {
                    Ok(state.start_operation(failure(&code)))
                }
                InsertBehaviour::Reject(message) => Err(ComputeError::Provider {
                    status: Some(400),
                    message,
                }),
            }
        });
        Box::pin(ready(result))
    }

    fn delete_instance<'a>(
        &'a self,
        _project: &'a str,
        zone: &'a str,
        name: &'a str,
    ) -> ComputeFuture<'a, Operation> {
        let result = self.with_state(|state| {
            state
                .calls
                .push(ComputeCall::DeleteInstance(zone.to_owned(), name.to_owned()));
            if !state.has_instance(zone, name) {
                return Err(ComputeError::NotFound {
                    resource: format!("zones/{zone}/instances/{name}"),
                });
            }
            if state.failing_deletes.contains(name) {
                return Ok(state.start_operation(failure("RESOURCE_IN_USE_BY_ANOTHER_RESOURCE")));
            }
            state.zone_instances(zone).retain(|candidate| candidate != name);
            Ok(state.start_operation(Vec::new()))
        });
        Box::pin(ready(result))
    }

    fn get_operation<'a>(
        &'a self,
        _project: &'a str,
        zone: &'a str,
        operation: &'a str,
    ) -> ComputeFuture<'a, Operation> {
        let result = self.with_state(|state| {
            state.calls.push(ComputeCall::GetOperation(
                zone.to_owned(),
                operation.to_owned(),
            ));
            if state.operation_poll_failures > 0 {
                state.operation_poll_failures -= 1;
                return Err(provider_error("simulated operation poll failure"));
            }
            let Some(pending) = state.operations.get_mut(operation) else {
                return Err(ComputeError::NotFound {
                    resource: format!("zones/{zone}/operations/{operation}"),
                });
            };
            pending.remaining_polls = pending.remaining_polls.saturating_sub(1);
            if pending.remaining_polls == 0 {
                Ok(Operation {
                    name: operation.to_owned(),
                    status: OperationStatus::Done,
                    errors: pending.errors.clone(),
                })
            } else {
                Ok(Operation {
                    name: operation.to_owned(),
                    status: OperationStatus::Running,
                    errors: Vec::new(),
                })
            }
        });
        Box::pin(ready(result))
    }
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CommandError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}
