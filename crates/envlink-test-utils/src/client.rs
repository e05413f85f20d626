//! Request helpers for driving a [`Connection`] in tests.
//!
//! Each helper sends one request and panics with the full response if it
//! did not succeed with the expected kind.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use envlink_core::{
    ActionObservationSpecs, EnvironmentState, ProtocolError, Request, Response, Settings, Tensor,
    Uid,
};
use envlink_server::Connection;
use indexmap::IndexMap;

use crate::counter::HookEvent;

pub fn create_world(conn: &mut Connection, settings: Settings) -> String {
    match conn.handle(Request::CreateWorld { settings }) {
        Response::CreateWorld { world_name } => world_name,
        other => panic!("CreateWorld failed: {other:?}"),
    }
}

pub fn join_world(conn: &mut Connection, world: &str, settings: Settings) -> ActionObservationSpecs {
    match conn.handle(Request::JoinWorld {
        world_name: world.to_owned(),
        settings,
    }) {
        Response::JoinWorld { specs } => specs,
        other => panic!("JoinWorld({world}) failed: {other:?}"),
    }
}

pub fn step(
    conn: &mut Connection,
    actions: IndexMap<Uid, Tensor>,
    requested: &[u64],
) -> (EnvironmentState, IndexMap<Uid, Tensor>) {
    match conn.handle(step_request(actions, requested)) {
        Response::Step {
            state,
            observations,
        } => (state, observations),
        other => panic!("Step failed: {other:?}"),
    }
}

pub fn step_request(actions: IndexMap<Uid, Tensor>, requested: &[u64]) -> Request {
    Request::Step {
        actions,
        requested_observations: crate::uids(requested),
    }
}

/// The error carried by `response`.
pub fn expect_error(response: Response) -> ProtocolError {
    match response {
        Response::Error(e) => e,
        other => panic!("expected an error response, got {other:?}"),
    }
}

/// Wait up to `timeout` for an event matching `pred`, discarding others.
pub fn wait_for(
    events: &Receiver<HookEvent>,
    timeout: Duration,
    mut pred: impl FnMut(&HookEvent) -> bool,
) -> Option<HookEvent> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        match events.recv_timeout(remaining) {
            Ok(event) if pred(&event) => return Some(event),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}
