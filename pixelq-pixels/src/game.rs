//! Pixel games.
use anyhow::Result;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A game that renders its state as raw RGB frames.
///
/// This is the seam between the training stack and a simulator: the
/// wrapper [`PixelEnv`](crate::PixelEnv) drives a game through this trait
/// and never looks at its internals, only at the rendered pixels.
pub trait PixelGame {
    /// Configuration of the game.
    type Config: Clone;

    /// Builds the game with a random seed.
    fn build(config: &Self::Config, seed: u64) -> Result<Self>
    where
        Self: Sized;

    /// Frame width in pixels.
    fn width(&self) -> u32;

    /// Frame height in pixels.
    fn height(&self) -> u32;

    /// The number of discrete actions.
    fn num_actions(&self) -> usize;

    /// Starts a new episode.
    fn reset(&mut self);

    /// Advances the game by one tick and returns the reward.
    fn step(&mut self, action: u32) -> f32;

    /// True once the current episode ended.
    fn is_over(&self) -> bool;

    /// Renders the current state as `width * height * 3` RGB bytes.
    fn render_rgb(&self, buf: &mut [u8]);
}

/// Configuration of [`Catcher`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CatcherConfig {
    /// Frame width and height in pixels.
    pub size: u32,

    /// Maximum number of ticks per episode.
    pub max_steps: usize,
}

impl Default for CatcherConfig {
    fn default() -> Self {
        Self {
            size: 48,
            max_steps: 200,
        }
    }
}

impl CatcherConfig {
    /// Sets the frame width and height.
    pub fn size(mut self, v: u32) -> Self {
        self.size = v;
        self
    }

    /// Sets the maximum number of ticks per episode.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }
}

/// A minimal catching game rendered as RGB frames.
///
/// A ball falls from the top of the screen; a paddle at the bottom moves
/// left, stays, or moves right. Catching the ball yields +1 and respawns
/// it at a random column; missing yields -1 and ends the episode. The
/// episode also ends after `max_steps` ticks.
pub struct Catcher {
    size: u32,
    max_steps: usize,
    ball_x: i32,
    ball_y: i32,
    paddle_x: i32,
    steps: usize,
    over: bool,
    rng: SmallRng,
}

const BALL: i32 = 4;
const PADDLE_W: i32 = 12;
const PADDLE_H: i32 = 2;
const PADDLE_SPEED: i32 = 2;
const BALL_SPEED: i32 = 2;

impl Catcher {
    fn spawn_ball(&mut self) {
        self.ball_x = self.rng.gen_range(0..self.size as i32 - BALL);
        self.ball_y = 0;
    }

    fn fill(buf: &mut [u8], size: u32, x: i32, y: i32, w: i32, h: i32, rgb: [u8; 3]) {
        let size = size as i32;
        for py in y.max(0)..(y + h).min(size) {
            for px in x.max(0)..(x + w).min(size) {
                let i = ((py * size + px) * 3) as usize;
                buf[i..i + 3].copy_from_slice(&rgb);
            }
        }
    }
}

impl PixelGame for Catcher {
    type Config = CatcherConfig;

    fn build(config: &Self::Config, seed: u64) -> Result<Self> {
        let mut game = Self {
            size: config.size,
            max_steps: config.max_steps,
            ball_x: 0,
            ball_y: 0,
            paddle_x: 0,
            steps: 0,
            over: false,
            rng: SmallRng::seed_from_u64(seed),
        };
        game.reset();
        Ok(game)
    }

    fn width(&self) -> u32 {
        self.size
    }

    fn height(&self) -> u32 {
        self.size
    }

    fn num_actions(&self) -> usize {
        3
    }

    fn reset(&mut self) {
        self.paddle_x = (self.size as i32 - PADDLE_W) / 2;
        self.steps = 0;
        self.over = false;
        self.spawn_ball();
    }

    fn step(&mut self, action: u32) -> f32 {
        let size = self.size as i32;

        match action {
            0 => self.paddle_x -= PADDLE_SPEED,
            2 => self.paddle_x += PADDLE_SPEED,
            _ => {}
        }
        self.paddle_x = self.paddle_x.clamp(0, size - PADDLE_W);

        self.ball_y += BALL_SPEED;
        self.steps += 1;
        if self.steps >= self.max_steps {
            self.over = true;
        }

        if self.ball_y + BALL >= size - PADDLE_H {
            let caught = self.ball_x + BALL > self.paddle_x
                && self.ball_x < self.paddle_x + PADDLE_W;
            if caught {
                self.spawn_ball();
                1.
            } else {
                self.over = true;
                -1.
            }
        } else {
            0.
        }
    }

    fn is_over(&self) -> bool {
        self.over
    }

    fn render_rgb(&self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = 0;
        }
        Self::fill(
            buf,
            self.size,
            self.ball_x,
            self.ball_y,
            BALL,
            BALL,
            [255, 255, 255],
        );
        Self::fill(
            buf,
            self.size,
            self.paddle_x,
            self.size as i32 - PADDLE_H,
            PADDLE_W,
            PADDLE_H,
            [255, 128, 0],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> Catcher {
        Catcher::build(&CatcherConfig::default(), 0).unwrap()
    }

    #[test]
    fn catching_rewards_and_respawns() {
        let mut game = game();
        // Track the ball from directly below until it lands.
        let mut reward = 0.;
        for _ in 0..1000 {
            let action = if game.ball_x + BALL / 2 < game.paddle_x + PADDLE_W / 2 {
                0
            } else if game.ball_x + BALL / 2 > game.paddle_x + PADDLE_W / 2 {
                2
            } else {
                1
            };
            reward = game.step(action);
            if reward != 0. {
                break;
            }
        }
        assert_eq!(reward, 1.);
        assert!(!game.is_over());
        assert_eq!(game.ball_y, 0);
    }

    #[test]
    fn missing_ends_the_episode() {
        let mut game = game();
        let mut reward = 0.;
        // Steer the paddle to the half of the screen opposite the ball, so
        // the ball is guaranteed to land out of reach.
        for _ in 0..1000 {
            let action = if game.ball_x < game.size as i32 / 2 {
                2
            } else {
                0
            };
            reward = game.step(action);
            if game.is_over() {
                break;
            }
        }
        assert_eq!(reward, -1.);
        assert!(game.is_over());
    }

    #[test]
    fn episode_ends_at_step_cap() {
        let config = CatcherConfig::default().max_steps(5);
        let mut game = Catcher::build(&config, 0).unwrap();
        for _ in 0..5 {
            game.step(1);
        }
        assert!(game.is_over());
    }

    #[test]
    fn render_has_expected_size_and_content() {
        let game = game();
        let mut buf = vec![0u8; (game.width() * game.height() * 3) as usize];
        game.render_rgb(&mut buf);
        assert!(buf.iter().any(|&b| b != 0));
    }
}
