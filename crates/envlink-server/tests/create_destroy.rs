//! Integration test: world creation and destruction policies.

use std::time::Duration;

use envlink_core::{ErrorKind, Request, Response, SessionState, Settings, Tensor};
use envlink_server::{DestroyPolicy, Server, ServerConfig};
use envlink_test_utils::client::{create_world, expect_error, join_world, step, wait_for};
use envlink_test_utils::{settings, tensors, CatchFactory, CounterFactory, HookEvent};

fn counter_server(config: ServerConfig) -> (Server, crossbeam_channel::Receiver<HookEvent>) {
    let (factory, events) = CounterFactory::new();
    let server = Server::builder(factory).config(config).build().unwrap();
    (server, events)
}

fn destroy(world: &str) -> Request {
    Request::DestroyWorld {
        world_name: world.to_owned(),
    }
}

#[test]
fn create_returns_factory_name() {
    let (server, _events) = counter_server(ServerConfig::default());
    let mut conn = server.connect();
    let name = create_world(&mut conn, settings([("name", Tensor::from("arena"))]));
    assert_eq!(name, "arena");
    assert_eq!(server.world_names(), vec!["arena".to_owned()]);
    assert_eq!(conn.state(), SessionState::NotJoined);
}

#[test]
fn duplicate_name_is_conflict() {
    let (server, events) = counter_server(ServerConfig::default());
    let mut conn = server.connect();
    create_world(&mut conn, settings([("name", Tensor::from("arena"))]));
    let err = expect_error(conn.handle(Request::CreateWorld {
        settings: settings([("name", Tensor::from("arena"))]),
    }));
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(server.live_worlds(), 1);
    // The rejected world was torn down.
    assert!(wait_for(&events, Duration::from_secs(5), |e| matches!(
        e,
        HookEvent::Destroyed { world } if world == "arena"
    ))
    .is_some());
}

#[test]
fn unknown_setting_is_validation_error() {
    let (server, _events) = counter_server(ServerConfig::default());
    let mut conn = server.connect();
    let err = expect_error(conn.handle(Request::CreateWorld {
        settings: settings([("colour", Tensor::from("red"))]),
    }));
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.field.as_deref(), Some("colour"));
    assert_eq!(server.live_worlds(), 0);
}

#[test]
fn world_limit_refuses_extra_worlds() {
    let (server, _events) = counter_server(ServerConfig {
        max_live_worlds: Some(1),
        ..ServerConfig::default()
    });
    let mut conn = server.connect();
    let first = create_world(&mut conn, Settings::new());
    let err = expect_error(conn.handle(Request::CreateWorld {
        settings: Settings::new(),
    }));
    assert_eq!(err.kind, ErrorKind::Conflict);

    assert_eq!(conn.handle(destroy(&first)), Response::DestroyWorld);
    create_world(&mut conn, Settings::new());
}

#[test]
fn destroy_empty_world() {
    let (server, events) = counter_server(ServerConfig::default());
    let mut conn = server.connect();
    let name = create_world(&mut conn, Settings::new());
    assert_eq!(conn.handle(destroy(&name)), Response::DestroyWorld);
    assert!(server.world_names().is_empty());
    assert!(events
        .try_iter()
        .any(|e| e == HookEvent::Destroyed { world: name.clone() }));

    let err = expect_error(conn.handle(destroy(&name)));
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.field.as_deref(), Some(name.as_str()));
}

#[test]
fn self_destroy_is_refused_under_every_policy() {
    for policy in [DestroyPolicy::Refuse, DestroyPolicy::Force, DestroyPolicy::Block] {
        let (server, _events) = counter_server(ServerConfig {
            destroy_policy: policy,
            ..ServerConfig::default()
        });
        let mut conn = server.connect();
        let name = create_world(&mut conn, Settings::new());
        join_world(&mut conn, &name, Settings::new());
        let err = expect_error(conn.handle(destroy(&name)));
        assert_eq!(err.kind, ErrorKind::Conflict, "{policy:?}");
        assert_eq!(conn.state(), SessionState::Interrupted);
        assert_eq!(server.live_worlds(), 1);
    }
}

#[test]
fn refuse_policy_keeps_world_with_joined_sessions() {
    let (server, _events) = counter_server(ServerConfig::default());
    let mut admin = server.connect();
    let mut player = server.connect();
    let name = create_world(&mut admin, Settings::new());
    join_world(&mut player, &name, Settings::new());

    let err = expect_error(admin.handle(destroy(&name)));
    assert_eq!(err.kind, ErrorKind::Conflict);

    player.handle(Request::LeaveWorld);
    assert_eq!(admin.handle(destroy(&name)), Response::DestroyWorld);
}

#[test]
fn force_policy_unbinds_joined_sessions() {
    let (server, _events) = counter_server(ServerConfig {
        destroy_policy: DestroyPolicy::Force,
        ..ServerConfig::default()
    });
    let mut admin = server.connect();
    let mut player = server.connect();
    let name = create_world(&mut admin, Settings::new());
    join_world(&mut player, &name, Settings::new());
    step(&mut player, tensors([]), &[1]);

    assert_eq!(admin.handle(destroy(&name)), Response::DestroyWorld);

    let err = expect_error(player.handle(Request::Step {
        actions: tensors([(1, Tensor::scalar(1i32))]),
        requested_observations: vec![],
    }));
    assert_eq!(err.kind, ErrorKind::State);
    assert_eq!(player.state(), SessionState::NotJoined);
    // The session is free to join elsewhere.
    let other = create_world(&mut admin, Settings::new());
    join_world(&mut player, &other, Settings::new());
}

#[test]
fn block_policy_waits_for_sessions_to_leave() {
    let (server, events) = counter_server(ServerConfig {
        destroy_policy: DestroyPolicy::Block,
        ..ServerConfig::default()
    });
    let mut player = server.connect();
    let name = create_world(&mut player, Settings::new());
    join_world(&mut player, &name, Settings::new());

    let admin = server.spawn_connection().unwrap();
    admin.send(destroy(&name)).unwrap();
    assert!(admin.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(server.live_worlds(), 1);

    assert_eq!(player.handle(Request::LeaveWorld), Response::LeaveWorld);
    assert_eq!(admin.recv().unwrap(), Response::DestroyWorld);
    assert!(wait_for(&events, Duration::from_secs(5), |e| matches!(
        e,
        HookEvent::Destroyed { .. }
    ))
    .is_some());
    assert!(server.world_names().is_empty());
    admin.close().unwrap();
}

#[test]
fn catch_allows_one_world_at_a_time() {
    let server = Server::new(CatchFactory::new()).unwrap();
    let mut conn = server.connect();
    assert_eq!(create_world(&mut conn, Settings::new()), "catch");
    let err = expect_error(conn.handle(Request::CreateWorld {
        settings: Settings::new(),
    }));
    assert_eq!(err.kind, ErrorKind::Conflict);

    assert_eq!(conn.handle(destroy("catch")), Response::DestroyWorld);
    assert_eq!(create_world(&mut conn, Settings::new()), "catch");
}
