//! In-Memory Backend
//!
//! A non-durable, in-process implementation of the backend command surface.
//! Each registered entity gets a table and the commands from its
//! [`CommandSet`]. Used by the smoke test binary and the test suites, and
//! handy for demos where no real backend is reachable.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{GatewayCall, GatewayError, RemoteGateway};
use crate::entities::crew::{DELETE_WARNING_COMMAND, FORCE_DELETE_COMMAND, REASSIGN_MEMBERS_COMMAND};
use crate::entities::{
    Client, CommandSet, Crew, Entity, EntityKind, GrapeType, PackagingType, Production, Season,
    Variety, Worker,
};

type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    List,
    ListInactive,
    ListAll,
    GetById,
    Insert,
    Update,
    Delete,
    Reactivate,
    ListByParent,
    CrewDeleteWarning,
    CrewForceDelete,
    CrewReassign,
}

struct Table {
    commands: CommandSet,
    validate: fn(&Value) -> Result<(), String>,
    rows: BTreeMap<i64, Row>,
    next_id: i64,
}

impl Table {
    fn is_active(&self, row: &Row) -> bool {
        match self.commands.soft_delete {
            Some(sd) => row.get(sd.field).and_then(Value::as_str) != Some(sd.inactive),
            None => true,
        }
    }

    fn select(&self, filter: impl Fn(&Row) -> bool) -> Value {
        Value::Array(
            self.rows
                .values()
                .filter(|r| filter(r))
                .map(|r| Value::Object(r.clone()))
                .collect(),
        )
    }
}

#[derive(Default)]
struct BackendState {
    tables: HashMap<EntityKind, Table>,
    routes: HashMap<&'static str, (EntityKind, Route)>,
    failures: HashMap<String, VecDeque<GatewayError>>,
    calls: Vec<GatewayCall>,
}

fn validate_draft<E: Entity>(data: &Value) -> Result<(), String> {
    serde_json::from_value::<E::Draft>(data.clone())
        .map(|_| ())
        .map_err(|e| format!("invalid {} payload: {}", E::KIND, e))
}

fn now() -> Value {
    Value::String(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string())
}

fn arg_id(args: &Value, name: &str) -> Result<i64, GatewayError> {
    args.get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| GatewayError::Rejected(format!("missing argument '{}'", name)))
}

fn arg_data(args: &Value) -> Result<&Row, GatewayError> {
    args.get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| GatewayError::Rejected("missing argument 'data'".to_string()))
}

/// In-process backend serving the harvest command surface
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
}

impl InMemoryBackend {
    /// An empty backend with no commands registered
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(BackendState::default()),
        }
    }

    /// A backend serving every harvest entity plus the crew extensions
    pub fn new() -> Self {
        Self::empty()
            .with_entity::<Client>()
            .with_entity::<Crew>()
            .with_entity::<Worker>()
            .with_entity::<Production>()
            .with_entity::<Season>()
            .with_entity::<GrapeType>()
            .with_entity::<PackagingType>()
            .with_entity::<Variety>()
            .with_crew_extensions()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a table and the commands of `E`
    pub fn with_entity<E: Entity>(self) -> Self {
        {
            let mut state = self.lock();
            let c = E::COMMANDS;
            state.tables.insert(
                E::KIND,
                Table {
                    commands: c,
                    validate: validate_draft::<E>,
                    rows: BTreeMap::new(),
                    next_id: 1,
                },
            );

            let mut routes = vec![
                (c.list, Route::List),
                (c.get_by_id, Route::GetById),
                (c.insert, Route::Insert),
                (c.update, Route::Update),
                (c.delete, Route::Delete),
            ];
            routes.extend(c.list_inactive.map(|cmd| (cmd, Route::ListInactive)));
            routes.extend(c.list_all.map(|cmd| (cmd, Route::ListAll)));
            routes.extend(c.reactivate.map(|cmd| (cmd, Route::Reactivate)));
            routes.extend(c.list_by_parent.map(|p| (p.command, Route::ListByParent)));

            for (cmd, route) in routes {
                state.routes.insert(cmd, (E::KIND, route));
            }
        }
        self
    }

    /// Register the crew delete-warning, force-delete and reassign commands
    pub fn with_crew_extensions(self) -> Self {
        {
            let mut state = self.lock();
            state.routes.insert(DELETE_WARNING_COMMAND, (EntityKind::Crew, Route::CrewDeleteWarning));
            state.routes.insert(FORCE_DELETE_COMMAND, (EntityKind::Crew, Route::CrewForceDelete));
            state.routes.insert(REASSIGN_MEMBERS_COMMAND, (EntityKind::Crew, Route::CrewReassign));
        }
        self
    }

    /// Insert a record as-is, bypassing validation; returns the assigned id
    pub fn seed<E: Entity>(&self, record: &impl Serialize) -> Result<i64, GatewayError> {
        let value = serde_json::to_value(record).map_err(|e| GatewayError::Rejected(e.to_string()))?;
        let mut state = self.lock();
        let table = state
            .tables
            .get_mut(&E::KIND)
            .ok_or_else(|| GatewayError::Rejected(format!("no table for {}", E::KIND)))?;
        let mut row = value
            .as_object()
            .cloned()
            .ok_or_else(|| GatewayError::Rejected("seed record must be an object".to_string()))?;

        let id = match row.get("id").and_then(Value::as_i64) {
            Some(id) => id,
            None => table.next_id,
        };
        table.next_id = table.next_id.max(id + 1);
        row.insert("id".to_string(), json!(id));
        row.entry("created_at").or_insert_with(now);
        row.entry("updated_at").or_insert_with(now);
        table.rows.insert(id, row);
        Ok(id)
    }

    /// Make the next invocation of `command` fail with `error`
    pub fn fail_next(&self, command: &str, error: GatewayError) {
        self.lock()
            .failures
            .entry(command.to_string())
            .or_default()
            .push_back(error);
    }

    /// Every call received so far, in arrival order
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    /// How many times `command` has been invoked
    pub fn call_count(&self, command: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.command == command).count()
    }

    /// Current rows of a table, in id order
    pub fn rows<E: Entity>(&self) -> Vec<E> {
        let state = self.lock();
        state
            .tables
            .get(&E::KIND)
            .map(|t| {
                t.rows
                    .values()
                    .filter_map(|r| serde_json::from_value(Value::Object(r.clone())).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn dispatch(&self, call: &GatewayCall) -> Result<Value, GatewayError> {
        let mut state = self.lock();
        state.calls.push(call.clone());

        if let Some(err) = state.failures.get_mut(&call.command).and_then(VecDeque::pop_front) {
            return Err(err);
        }

        let (kind, route) = *state
            .routes
            .get(call.command.as_str())
            .ok_or_else(|| GatewayError::UnknownCommand(call.command.clone()))?;

        match route {
            Route::CrewDeleteWarning => return crew_delete_warning(&state, &call.args),
            Route::CrewForceDelete => return crew_force_delete(&mut state, &call.args),
            Route::CrewReassign => return crew_reassign(&mut state, &call.args),
            _ => {}
        }

        let table = state
            .tables
            .get_mut(&kind)
            .ok_or_else(|| GatewayError::UnknownCommand(call.command.clone()))?;
        let args = &call.args;

        match route {
            Route::List => Ok(table.select(|r| table.is_active(r))),
            Route::ListInactive => Ok(table.select(|r| !table.is_active(r))),
            Route::ListAll => Ok(table.select(|_| true)),
            Route::GetById => {
                let id = arg_id(args, "id")?;
                Ok(table.rows.get(&id).cloned().map(Value::Object).unwrap_or(Value::Null))
            }
            Route::ListByParent => {
                let lookup = table
                    .commands
                    .list_by_parent
                    .ok_or_else(|| GatewayError::UnknownCommand(call.command.clone()))?;
                let parent = arg_id(args, lookup.arg)?;
                Ok(table.select(|r| {
                    table.is_active(r) && r.get(lookup.field).and_then(Value::as_i64) == Some(parent)
                }))
            }
            Route::Insert => {
                let data = arg_data(args)?;
                (table.validate)(&Value::Object(data.clone())).map_err(GatewayError::Rejected)?;
                let id = table.next_id;
                table.next_id += 1;

                let mut row = data.clone();
                row.insert("id".to_string(), json!(id));
                row.insert("created_at".to_string(), now());
                row.insert("updated_at".to_string(), now());
                table.rows.insert(id, row.clone());

                if table.commands.echoes_record {
                    Ok(Value::Object(row))
                } else {
                    Ok(json!(format!("{} inserted with ID: {}", kind, id)))
                }
            }
            Route::Update => {
                let id = arg_id(args, "id")?;
                let data = arg_data(args)?;
                (table.validate)(&Value::Object(data.clone())).map_err(GatewayError::Rejected)?;
                let echoes = table.commands.echoes_record;
                let row = table
                    .rows
                    .get_mut(&id)
                    .ok_or_else(|| GatewayError::Rejected(format!("no {} with ID: {}", kind, id)))?;
                for (k, v) in data {
                    row.insert(k.clone(), v.clone());
                }
                row.insert("updated_at".to_string(), now());

                if echoes {
                    Ok(Value::Object(row.clone()))
                } else {
                    Ok(json!(format!("{} ID: {} updated", kind, id)))
                }
            }
            Route::Delete => {
                let id = arg_id(args, "id")?;
                if !table.rows.contains_key(&id) {
                    return Err(GatewayError::Rejected(format!("no {} with ID: {}", kind, id)));
                }
                if kind == EntityKind::Crew {
                    let members = crew_members(&state, id);
                    if members > 0 {
                        return Err(GatewayError::Rejected(format!(
                            "crew {} still has {} assigned workers",
                            id, members
                        )));
                    }
                    if let Some(t) = state.tables.get_mut(&kind) {
                        t.rows.remove(&id);
                    }
                    return Ok(json!(format!("crew ID: {} deleted", id)));
                }

                match table.commands.soft_delete {
                    Some(sd) => {
                        if let Some(row) = table.rows.get_mut(&id) {
                            row.insert(sd.field.to_string(), json!(sd.inactive));
                            row.insert("updated_at".to_string(), now());
                        }
                        Ok(json!(format!("{} ID: {} deactivated", kind, id)))
                    }
                    None => {
                        table.rows.remove(&id);
                        Ok(json!(format!("{} ID: {} deleted", kind, id)))
                    }
                }
            }
            Route::Reactivate => {
                let id = arg_id(args, "id")?;
                let sd = table
                    .commands
                    .soft_delete
                    .ok_or_else(|| GatewayError::UnknownCommand(call.command.clone()))?;
                let row = table
                    .rows
                    .get_mut(&id)
                    .ok_or_else(|| GatewayError::Rejected(format!("no {} with ID: {}", kind, id)))?;
                row.insert(sd.field.to_string(), json!(sd.active));
                row.insert("updated_at".to_string(), now());
                Ok(json!(format!("{} ID: {} reactivated", kind, id)))
            }
            Route::CrewDeleteWarning | Route::CrewForceDelete | Route::CrewReassign => {
                unreachable!("crew extensions are dispatched above")
            }
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn crew_member_field() -> &'static str {
    Worker::COMMANDS
        .list_by_parent
        .map(|p| p.field)
        .unwrap_or("cuadrilla_id")
}

fn crew_members(state: &BackendState, crew_id: i64) -> usize {
    let field = crew_member_field();
    state
        .tables
        .get(&EntityKind::Worker)
        .map(|t| {
            t.rows
                .values()
                .filter(|r| r.get(field).and_then(Value::as_i64) == Some(crew_id))
                .count()
        })
        .unwrap_or(0)
}

fn unassign_members(state: &mut BackendState, crew_id: i64) -> usize {
    let field = crew_member_field();
    let mut count = 0;
    if let Some(workers) = state.tables.get_mut(&EntityKind::Worker) {
        for row in workers.rows.values_mut() {
            if row.get(field).and_then(Value::as_i64) == Some(crew_id) {
                row.insert(field.to_string(), Value::Null);
                row.insert("updated_at".to_string(), now());
                count += 1;
            }
        }
    }
    count
}

fn crew_exists(state: &BackendState, crew_id: i64) -> Result<(), GatewayError> {
    let exists = state
        .tables
        .get(&EntityKind::Crew)
        .map_or(false, |t| t.rows.contains_key(&crew_id));
    if exists {
        Ok(())
    } else {
        Err(GatewayError::Rejected(format!("no crew with ID: {}", crew_id)))
    }
}

fn crew_delete_warning(state: &BackendState, args: &Value) -> Result<Value, GatewayError> {
    let id = arg_id(args, "id")?;
    crew_exists(state, id)?;
    let members = crew_members(state, id);
    if members == 0 {
        Ok(json!(""))
    } else {
        Ok(json!(format!(
            "crew {} has {} assigned workers that will be left without a crew",
            id, members
        )))
    }
}

fn crew_force_delete(state: &mut BackendState, args: &Value) -> Result<Value, GatewayError> {
    let id = arg_id(args, "id")?;
    crew_exists(state, id)?;
    let unassigned = unassign_members(state, id);
    if let Some(crews) = state.tables.get_mut(&EntityKind::Crew) {
        crews.rows.remove(&id);
    }
    Ok(json!(format!("crew ID: {} deleted, {} workers unassigned", id, unassigned)))
}

fn crew_reassign(state: &mut BackendState, args: &Value) -> Result<Value, GatewayError> {
    let id = arg_id(args, "id")?;
    crew_exists(state, id)?;
    let unassigned = unassign_members(state, id);
    Ok(json!(format!("{} workers unassigned from crew {}", unassigned, id)))
}

#[async_trait]
impl RemoteGateway for InMemoryBackend {
    async fn invoke(&self, call: GatewayCall) -> Result<Value, GatewayError> {
        let result = self.dispatch(&call);
        // Settle on a later poll so callers observe a real suspension point.
        tokio::task::yield_now().await;
        result
    }
}
