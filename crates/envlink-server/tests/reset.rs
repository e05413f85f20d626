//! Integration test: per-session Reset.

use envlink_core::{
    EnvironmentState, ErrorKind, Request, Response, SessionState, Settings, Tensor, Uid,
};
use envlink_server::{Connection, Server};
use envlink_test_utils::client::{create_world, expect_error, join_world, step, step_request};
use envlink_test_utils::{settings, tensors, CounterFactory};

fn running() -> (Server, Connection) {
    let (factory, _events) = CounterFactory::new();
    let server = Server::new(factory).unwrap();
    let mut conn = server.connect();
    let name = create_world(&mut conn, Settings::new());
    join_world(&mut conn, &name, Settings::new());
    step(&mut conn, tensors([]), &[]);
    step(&mut conn, tensors([(1, Tensor::scalar(5i32))]), &[]);
    (server, conn)
}

fn reset(conn: &mut Connection, settings: Settings) -> Response {
    conn.handle(Request::Reset { settings })
}

#[test]
fn reset_while_unjoined_is_state_error() {
    let (factory, _events) = CounterFactory::new();
    let server = Server::new(factory).unwrap();
    let mut conn = server.connect();
    let err = expect_error(reset(&mut conn, Settings::new()));
    assert_eq!(err.kind, ErrorKind::State);
    assert_eq!(conn.state(), SessionState::NotJoined);
}

#[test]
fn reset_interrupts_and_next_step_starts_fresh() {
    let (_server, mut conn) = running();
    let Response::Reset { specs } = reset(&mut conn, Settings::new()) else {
        panic!("reset failed");
    };
    assert_eq!(specs.action_uid("delta"), Some(Uid(1)));
    assert_eq!(conn.state(), SessionState::Interrupted);

    let (state, obs) = step(&mut conn, tensors([(1, Tensor::scalar(3i32))]), &[1]);
    assert_eq!(state, EnvironmentState::Running);
    assert_eq!(obs[&Uid(1)], Tensor::scalar(0i64));
    assert_eq!(conn.session().sequence(), 2);
}

#[test]
fn reset_rebuilds_uids() {
    let (_server, mut conn) = running();
    let Response::Reset { specs } = reset(&mut conn, settings([("bonus", Tensor::scalar(true))])) else {
        panic!("reset failed");
    };
    assert_eq!(specs.action_uid("bonus"), Some(Uid(1)));
    assert_eq!(specs.action_uid("delta"), Some(Uid(2)));

    step(&mut conn, tensors([]), &[]);
    let actions = tensors([(1, Tensor::scalar(10i32)), (2, Tensor::scalar(1i32))]);
    let (_, obs) = step(&mut conn, actions, &[1]);
    assert_eq!(obs[&Uid(1)], Tensor::scalar(11i64));

    // Uid 1 now names `bonus`, so a lone value there misses `delta`.
    let err = expect_error(conn.handle(step_request(tensors([(1, Tensor::scalar(1i32))]), &[])));
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[test]
fn rejected_reset_leaves_session_running() {
    let (_server, mut conn) = running();
    let err = expect_error(reset(&mut conn, settings([("speed", Tensor::scalar(2i32))])));
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(conn.state(), SessionState::Running);

    let (_, obs) = step(&mut conn, tensors([(1, Tensor::scalar(1i32))]), &[1]);
    assert_eq!(obs[&Uid(1)], Tensor::scalar(6i64));
}

#[test]
fn reset_is_valid_in_every_joined_state() {
    let (factory, _events) = CounterFactory::new();
    let server = Server::new(factory).unwrap();
    let mut conn = server.connect();
    let name = create_world(&mut conn, settings([("limit", Tensor::scalar(2i64))]));
    join_world(&mut conn, &name, Settings::new());

    // Interrupted, straight after joining.
    assert!(matches!(reset(&mut conn, Settings::new()), Response::Reset { .. }));
    step(&mut conn, tensors([]), &[]);
    step(&mut conn, tensors([(1, Tensor::scalar(2i32))]), &[]);
    assert_eq!(conn.state(), SessionState::Terminated);
    assert!(matches!(reset(&mut conn, Settings::new()), Response::Reset { .. }));
    assert_eq!(conn.state(), SessionState::Interrupted);
}
