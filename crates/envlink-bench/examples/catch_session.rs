//! End-to-end Catch session example.
//!
//! Demonstrates: create world → join → step with a tracking policy → read
//! rewards → ResetWorld with a new seed → repeat.
//!
//! Set `RUST_LOG=envlink_server=debug` to watch the world actor.

use envlink_core::{EnvironmentState, Request, Response, Settings, Tensor, Uid};
use envlink_server::{Connection, Server};
use envlink_test_utils::catch::{COLUMNS, ROWS};
use envlink_test_utils::CatchFactory;
use indexmap::IndexMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Uids {
    paddle: Uid,
    board: Uid,
    reward: Uid,
}

/// Move the paddle toward the ball's column.
fn policy(board: &[f32]) -> i8 {
    let lit = |row: usize| (0..COLUMNS).find(|&c| board[row * COLUMNS + c] == 1.0);
    let paddle = lit(ROWS - 1);
    let ball = (0..ROWS - 1).find_map(lit);
    match (ball, paddle) {
        (Some(ball), Some(paddle)) if ball < paddle => -1,
        (Some(ball), Some(paddle)) if ball > paddle => 1,
        _ => 0,
    }
}

fn step(conn: &mut Connection, uids: &Uids, paddle: i8) -> (EnvironmentState, Vec<f32>, f32) {
    let mut actions = IndexMap::new();
    actions.insert(uids.paddle, Tensor::scalar(paddle));
    let response = conn.handle(Request::Step {
        actions,
        requested_observations: vec![uids.board, uids.reward],
    });
    let Response::Step { state, observations } = response else {
        panic!("step failed: {response:?}");
    };
    let board = observations[&uids.board]
        .payload
        .as_slice::<f32>()
        .unwrap()
        .to_vec();
    let reward = *observations[&uids.reward].as_scalar::<f32>().unwrap();
    (state, board, reward)
}

/// Play until the sequence terminates; returns the final reward.
fn play_sequence(conn: &mut Connection, uids: &Uids) -> f32 {
    let (_, mut board, _) = step(conn, uids, 0);
    loop {
        let (state, next, reward) = step(conn, uids, policy(&board));
        if state == EnvironmentState::Terminated {
            return reward;
        }
        board = next;
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = Server::new(CatchFactory::new()).unwrap();
    let mut conn = server.connect();
    let Response::CreateWorld { world_name } = conn.handle(Request::CreateWorld {
        settings: [("seed".to_owned(), Tensor::scalar(42i64))].into_iter().collect(),
    }) else {
        panic!("create failed");
    };
    let Response::JoinWorld { specs } = conn.handle(Request::JoinWorld {
        world_name: world_name.clone(),
        settings: Settings::new(),
    }) else {
        panic!("join failed");
    };
    let uids = Uids {
        paddle: specs.action_uid("paddle").unwrap(),
        board: specs.observation_uid("board").unwrap(),
        reward: specs.observation_uid("reward").unwrap(),
    };

    for round in 0..2 {
        let rewards: Vec<f32> = (0..10).map(|_| play_sequence(&mut conn, &uids)).collect();
        let total: f32 = rewards.iter().sum();
        info!(round, sequences = rewards.len(), total, "round finished");

        // Reseed every game in the world. Nobody else is joined, so the
        // barrier releases at once.
        let response = conn.handle(Request::ResetWorld {
            world_name: world_name.clone(),
            settings: [("seed".to_owned(), Tensor::scalar(7i64))].into_iter().collect(),
        });
        assert_eq!(response, Response::ResetWorld);
    }

    conn.handle(Request::LeaveWorld);
    conn.handle(Request::DestroyWorld { world_name });
    info!(live_worlds = server.live_worlds(), "done");
}
