//! The Catch game.
//!
//! A ball falls one row per step down a random column of a 10x10 board.
//! The agent moves a paddle along the bottom row with the `paddle` action
//! (-1, 0, or 1). The sequence terminates when the ball reaches the bottom
//! row, with reward 1 if the paddle is under it and -1 otherwise.
//!
//! The server hosts at most one Catch world at a time, named `catch`.
//! Each joined session plays its own game. Games are seeded from a
//! counter so every run is reproducible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use envlink_core::{Array, DataType, EnvironmentState, SessionId, Settings, TensorSpec};
use envlink_server::{
    CreatedWorld, HookError, NamedArrays, StepInput, StepKind, StepOutcome, WorldFactory,
    WorldHooks, WorldSpecs,
};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const WORLD_NAME: &str = "catch";
pub const ROWS: usize = 10;
pub const COLUMNS: usize = 10;
const INITIAL_SEED: u64 = 1;

/// One game of Catch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatchGame {
    ball_x: usize,
    ball_y: usize,
    paddle_x: usize,
}

impl CatchGame {
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self {
            ball_x: rng.next_u32() as usize % COLUMNS,
            ball_y: 0,
            paddle_x: COLUMNS / 2,
        }
    }

    pub fn ball(&self) -> (usize, usize) {
        (self.ball_y, self.ball_x)
    }

    pub fn paddle(&self) -> usize {
        self.paddle_x
    }

    pub fn has_terminated(&self) -> bool {
        self.ball_y == ROWS - 1
    }

    /// Move the paddle, then drop the ball one row.
    pub fn update(&mut self, action: i8) {
        let target = self.paddle_x as i64 + i64::from(action);
        self.paddle_x = target.clamp(0, COLUMNS as i64 - 1) as usize;
        self.ball_y += 1;
    }

    pub fn reward(&self) -> f32 {
        match (self.has_terminated(), self.paddle_x == self.ball_x) {
            (false, _) => 0.0,
            (true, true) => 1.0,
            (true, false) => -1.0,
        }
    }

    /// Row-major board with 1.0 at the ball and the paddle.
    pub fn board(&self) -> Vec<f32> {
        let mut board = vec![0.0f32; ROWS * COLUMNS];
        board[self.ball_y * COLUMNS + self.ball_x] = 1.0;
        board[(ROWS - 1) * COLUMNS + self.paddle_x] = 1.0;
        board
    }
}

fn specs() -> WorldSpecs {
    WorldSpecs {
        actions: vec![TensorSpec::scalar("paddle", DataType::Int8).with_bounds(-1i8, 1i8)],
        observations: vec![
            TensorSpec::new("board", DataType::Float, vec![ROWS as i64, COLUMNS as i64]),
            TensorSpec::scalar("reward", DataType::Float),
        ],
    }
}

// ── CatchFactory ───────────────────────────────────────────────────

/// Creates the single `catch` world.
///
/// Settings: `seed` (int64, default 1), the seed of the first game.
#[derive(Debug, Default)]
pub struct CatchFactory {
    live: Arc<AtomicBool>,
}

impl CatchFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorldFactory for CatchFactory {
    fn create_world(&self, settings: &Settings) -> Result<CreatedWorld, HookError> {
        settings.reject_unknown(&["seed"])?;
        let seed = match settings.get("seed") {
            Some(t) => t
                .as_scalar::<i64>()
                .and_then(|s| u64::try_from(*s).ok())
                .ok_or_else(|| HookError::invalid_setting("seed", "expected a non-negative int64"))?,
            None => INITIAL_SEED,
        };
        if self.live.swap(true, Ordering::AcqRel) {
            return Err(HookError::Conflict(
                "catch supports a single world at a time".into(),
            ));
        }
        Ok(CreatedWorld {
            name: WORLD_NAME.to_owned(),
            hooks: Box::new(CatchWorld {
                games: HashMap::new(),
                next_seed: seed,
                live: Arc::clone(&self.live),
            }),
        })
    }
}

// ── CatchWorld ─────────────────────────────────────────────────────

/// The Catch world: one game per joined session.
pub struct CatchWorld {
    games: HashMap<SessionId, CatchGame>,
    next_seed: u64,
    live: Arc<AtomicBool>,
}

impl CatchWorld {
    fn new_game(&mut self) -> CatchGame {
        let game = CatchGame::new(self.next_seed);
        self.next_seed += 1;
        game
    }

    fn game(&mut self, session: SessionId) -> Result<&mut CatchGame, HookError> {
        self.games
            .get_mut(&session)
            .ok_or_else(|| HookError::NotFound(format!("session {session} is not playing")))
    }
}

impl WorldHooks for CatchWorld {
    fn join_world(&mut self, session: SessionId, settings: &Settings) -> Result<WorldSpecs, HookError> {
        settings.reject_unknown(&[])?;
        let game = self.new_game();
        self.games.insert(session, game);
        Ok(specs())
    }

    fn step(&mut self, session: SessionId, input: StepInput<'_>) -> Result<StepOutcome, HookError> {
        if input.kind == StepKind::StartSequence {
            let game = self.new_game();
            self.games.insert(session, game);
        }
        let game = self.game(session)?;
        if input.kind == StepKind::Continue {
            if game.has_terminated() {
                return Err(HookError::Validation("game has already terminated".into()));
            }
            let paddle = input
                .actions
                .get("paddle")
                .and_then(|a| a.as_slice::<i8>())
                .and_then(|s| s.first().copied())
                .unwrap_or(0);
            game.update(paddle);
        }

        let board = Array::from_vec(&[ROWS, COLUMNS], game.board())
            .ok_or_else(|| HookError::Validation("board size mismatch".into()))?;
        let mut observations = NamedArrays::new();
        observations.insert("board".into(), board);
        observations.insert("reward".into(), Array::scalar(game.reward()));
        let state = if game.has_terminated() {
            EnvironmentState::Terminated
        } else {
            EnvironmentState::Running
        };
        Ok(StepOutcome {
            state,
            observations,
        })
    }

    fn reset(&mut self, session: SessionId, settings: &Settings) -> Result<WorldSpecs, HookError> {
        settings.reject_unknown(&[])?;
        let game = self.new_game();
        *self.game(session)? = game;
        Ok(specs())
    }

    fn reset_world(&mut self, settings: &Settings) -> Result<(), HookError> {
        settings.reject_unknown(&["seed"])?;
        if let Some(seed) = settings.get("seed").and_then(|t| t.as_scalar::<i64>()) {
            self.next_seed = u64::try_from(*seed)
                .map_err(|_| HookError::invalid_setting("seed", "expected a non-negative int64"))?;
        }
        let sessions: Vec<SessionId> = self.games.keys().copied().collect();
        for session in sessions {
            let game = self.new_game();
            self.games.insert(session, game);
        }
        Ok(())
    }

    fn leave(&mut self, session: SessionId) {
        self.games.remove(&session);
    }

    fn destroy_world(&mut self) -> Result<(), HookError> {
        self.live.store(false, Ordering::Release);
        Ok(())
    }
}
