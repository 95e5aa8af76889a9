//! Hi-Lo Casino: guess the secret number, bet credits, win by difficulty
//! and speed.
//!
//! ```text
//! Menu ──1──▶ ChooseDifficulty ──1..5──▶ Bet ──amount──▶ Guessing
//!  ▲                                     │                  │
//!  └────────── invalid bet ──────────────┘                  │
//!  └──────────────────── win / out of guesses ──────────────┘
//! Menu ──Q──▶ done
//! ```
//!
//! Guesses allowed scale with the range (`max(3, sqrt(max))`). A win pays
//! `bet × multiplier`, scaled down linearly by how many guesses were used.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{DoorGame, DoorOutput};

const RULE: &str = "=============================================";

/// Tunables for a Hi-Lo session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiLoConfig {
    pub starting_credits: u64,
    /// Rounds a player may start per visit.
    pub turns_per_visit: u32,
}

impl Default for HiLoConfig {
    fn default() -> Self {
        Self {
            starting_credits: 1000,
            turns_per_visit: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Difficulty {
    name: &'static str,
    max: u64,
    multiplier: u64,
}

const DIFFICULTIES: [Difficulty; 5] = [
    Difficulty { name: "Easy", max: 50, multiplier: 2 },
    Difficulty { name: "Medium", max: 100, multiplier: 3 },
    Difficulty { name: "Hard", max: 200, multiplier: 5 },
    Difficulty { name: "Expert", max: 500, multiplier: 10 },
    Difficulty { name: "Insane", max: 1000, multiplier: 20 },
];

impl Difficulty {
    fn guesses_allowed(&self) -> u64 {
        (self.max as f64).sqrt().floor().max(3.0) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Menu,
    ChooseDifficulty,
    Bet(Difficulty),
    Guessing {
        difficulty: Difficulty,
        bet: u64,
        secret: u64,
        guess_num: u64,
    },
}

#[derive(Debug, Default)]
struct Stats {
    games_played: u64,
    games_won: u64,
    total_winnings: u64,
    biggest_win: u64,
    current_streak: u64,
    best_streak: u64,
}

/// The built-in Hi-Lo door.
pub struct HiLo {
    player: String,
    credits: u64,
    turns_left: u32,
    stats: Stats,
    phase: Phase,
    rng: StdRng,
}

impl HiLo {
    pub fn new(config: HiLoConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates a game with a fixed seed, for reproducible play.
    pub fn seeded(config: HiLoConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: HiLoConfig, rng: StdRng) -> Self {
        Self {
            player: String::new(),
            credits: config.starting_credits,
            turns_left: config.turns_per_visit,
            stats: Stats::default(),
            phase: Phase::Menu,
            rng,
        }
    }

    pub fn credits(&self) -> u64 {
        self.credits
    }

    fn menu(&self, mut out: DoorOutput) -> DoorOutput {
        out.push(RULE);
        out.push(format!("PLAYER: {}", self.player));
        out.push(format!(
            "Credits: {} | Turns left: {}",
            self.credits, self.turns_left
        ));
        out.push(RULE);
        out.push("1. Play Hi-Lo");
        out.push("2. Statistics");
        out.push("3. Game Rules");
        out.push("Q. Quit Game");
        out.prompt("Enter your choice:")
    }

    fn handle_menu(&mut self, line: &str) -> DoorOutput {
        match line.trim().to_ascii_uppercase().as_str() {
            "1" => {
                if self.credits == 0 {
                    return DoorOutput::new()
                        .line("You're out of credits! Game over!")
                        .finished();
                }
                if self.turns_left == 0 {
                    return self.menu(
                        DoorOutput::new().line("You've used all your turns for this visit!"),
                    );
                }
                self.phase = Phase::ChooseDifficulty;
                let mut out = DoorOutput::new().line("Choose your challenge:");
                for (i, d) in DIFFICULTIES.iter().enumerate() {
                    out.push(format!(
                        "{}. {} (1-{}) - {}x payout",
                        i + 1,
                        d.name,
                        d.max,
                        d.multiplier
                    ));
                }
                out.prompt("Select difficulty (1-5):")
            }
            "2" => self.menu(self.stats_screen()),
            "3" => self.menu(rules_screen()),
            "Q" => DoorOutput::new()
                .line("Thanks for playing Hi-Lo Casino!")
                .line(format!("You leave with {} credits.", self.credits))
                .finished(),
            _ => self.menu(DoorOutput::new().line("Invalid choice.")),
        }
    }

    fn handle_difficulty(&mut self, line: &str) -> DoorOutput {
        // Anything unrecognised falls back to Medium.
        let difficulty = line
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| DIFFICULTIES.get(i).copied())
            .unwrap_or(DIFFICULTIES[1]);
        self.phase = Phase::Bet(difficulty);
        DoorOutput::new()
            .line(format!("You have {} credits", self.credits))
            .line(format!(
                "Difficulty: {} (1-{}) - {}x payout",
                difficulty.name, difficulty.max, difficulty.multiplier
            ))
            .prompt("How much do you want to bet?")
    }

    fn handle_bet(&mut self, difficulty: Difficulty, line: &str) -> DoorOutput {
        let bet = match line.trim().parse::<u64>() {
            Ok(bet) if bet > 0 && bet <= self.credits => bet,
            Ok(_) => {
                self.phase = Phase::Menu;
                return self.menu(DoorOutput::new().line("Invalid bet amount!"));
            }
            Err(_) => {
                self.phase = Phase::Menu;
                return self.menu(DoorOutput::new().line("Please enter a valid number!"));
            }
        };

        let secret = self.rng.random_range(1..=difficulty.max);
        let allowed = difficulty.guesses_allowed();
        self.credits -= bet;
        self.turns_left = self.turns_left.saturating_sub(1);
        self.stats.games_played += 1;
        self.phase = Phase::Guessing {
            difficulty,
            bet,
            secret,
            guess_num: 1,
        };

        DoorOutput::new()
            .line(format!(
                "I'm thinking of a number between 1 and {}",
                difficulty.max
            ))
            .line(format!("You have {allowed} guesses to find it!"))
            .line(format!(
                "Bet: {bet} credits | Potential win: {} credits",
                bet * difficulty.multiplier
            ))
            .line(format!("--- Guess 1/{allowed} ---"))
            .prompt(format!("Your guess (1-{}):", difficulty.max))
    }

    fn handle_guess(
        &mut self,
        difficulty: Difficulty,
        bet: u64,
        secret: u64,
        guess_num: u64,
        line: &str,
    ) -> DoorOutput {
        let allowed = difficulty.guesses_allowed();
        let prompt = format!("Your guess (1-{}):", difficulty.max);

        let guess = match line.trim().parse::<u64>() {
            Ok(g) if (1..=difficulty.max).contains(&g) => g,
            Ok(_) => {
                return DoorOutput::new()
                    .line(format!("Please guess between 1 and {}!", difficulty.max))
                    .prompt(prompt);
            }
            Err(_) => {
                return DoorOutput::new()
                    .line("Please enter a valid number!")
                    .prompt(prompt);
            }
        };

        if guess == secret {
            let winnings = bet * difficulty.multiplier * (allowed - guess_num + 1) / allowed;
            self.credits += winnings;
            self.stats.games_won += 1;
            self.stats.total_winnings += winnings;
            self.stats.biggest_win = self.stats.biggest_win.max(winnings);
            self.stats.current_streak += 1;
            self.stats.best_streak = self.stats.best_streak.max(self.stats.current_streak);
            self.phase = Phase::Menu;

            let mut out = DoorOutput::new()
                .line(format!("WINNER! The number was {secret}!"))
                .line(format!("You won {winnings} credits!"));
            if guess_num == 1 {
                out.push("FIRST GUESS BONUS!");
            } else if guess_num <= allowed / 2 {
                out.push("Quick guess bonus!");
            }
            if self.stats.current_streak > 1 {
                out.push(format!("Winning streak: {}!", self.stats.current_streak));
            }
            return self.menu(out);
        }

        let hint = hint(guess, secret, difficulty.max);
        if guess_num >= allowed {
            self.stats.current_streak = 0;
            self.phase = Phase::Menu;
            let out = DoorOutput::new()
                .line(hint)
                .line(format!("Out of guesses! The number was {secret}"))
                .line(format!("You lost {bet} credits"));
            if self.credits == 0 {
                return out.line("You're out of credits! Game over!").finished();
            }
            return self.menu(out);
        }

        self.phase = Phase::Guessing {
            difficulty,
            bet,
            secret,
            guess_num: guess_num + 1,
        };
        DoorOutput::new()
            .line(hint)
            .line(format!("--- Guess {}/{allowed} ---", guess_num + 1))
            .prompt(prompt)
    }

    fn stats_screen(&self) -> DoorOutput {
        let mut out = DoorOutput::new().line("DETAILED STATISTICS");
        if self.stats.games_played == 0 {
            out.push("No games played yet!");
        } else {
            let win_rate = self.stats.games_won as f64 / self.stats.games_played as f64 * 100.0;
            out.push(format!(
                "Games Played: {} | Won: {} ({win_rate:.1}%)",
                self.stats.games_played, self.stats.games_won
            ));
            out.push(format!("Total Winnings: {}", self.stats.total_winnings));
            out.push(format!("Biggest Win: {}", self.stats.biggest_win));
        }
        out.push(format!(
            "Current Streak: {} | Best: {}",
            self.stats.current_streak, self.stats.best_streak
        ));
        out
    }
}

fn hint(guess: u64, secret: u64, max: u64) -> String {
    let (direction, distance) = if guess < secret {
        ("TOO LOW", secret - guess)
    } else {
        ("TOO HIGH", guess - secret)
    };
    if distance <= max / 20 {
        format!("{direction} - but you're very close!")
    } else if distance <= max / 10 {
        format!("{direction} - getting warmer!")
    } else {
        format!("{direction} - way off!")
    }
}

fn rules_screen() -> DoorOutput {
    let mut out = DoorOutput::new()
        .line("GAME RULES")
        .line("1. Choose your difficulty level (affects payout multiplier)")
        .line("2. Place your bet (can't exceed your credits)")
        .line("3. Guess the secret number within the allowed attempts")
        .line("4. Hints tell you TOO HIGH or TOO LOW")
        .line("5. Faster guesses pay more");
    for d in DIFFICULTIES {
        out.push(format!(
            "- {} (1-{}): {}x payout, {} guesses",
            d.name,
            d.max,
            d.multiplier,
            d.guesses_allowed()
        ));
    }
    out
}

impl DoorGame for HiLo {
    fn start(&mut self, player: &str) -> DoorOutput {
        self.player = player.to_string();
        self.phase = Phase::Menu;
        tracing::debug!(player, credits = self.credits, "hi-lo started");
        self.menu(
            DoorOutput::new()
                .line("HI-LO CASINO - NUMBER GUESSING")
                .line("Guess the number, win big!")
                .line(format!(
                    "Welcome, {player}! You have {} credits and {} turns.",
                    self.credits, self.turns_left
                )),
        )
    }

    fn handle_line(&mut self, line: &str) -> DoorOutput {
        match self.phase.clone() {
            Phase::Menu => self.handle_menu(line),
            Phase::ChooseDifficulty => self.handle_difficulty(line),
            Phase::Bet(difficulty) => self.handle_bet(difficulty, line),
            Phase::Guessing {
                difficulty,
                bet,
                secret,
                guess_num,
            } => self.handle_guess(difficulty, bet, secret, guess_num, line),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
