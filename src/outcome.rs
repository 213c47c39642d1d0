use serde::{Deserialize, Serialize};

/// Three-way match outcome, from the home side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Away,
    Draw,
    Home,
}

impl Outcome {
    /// `result ∈ {0=away,1=draw,2=home}` per the match record contract (§3).
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Outcome::Away),
            1 => Some(Outcome::Draw),
            2 => Some(Outcome::Home),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Outcome::Away => 0,
            Outcome::Draw => 1,
            Outcome::Home => 2,
        }
    }

    pub fn from_goals(home_goals: u32, away_goals: u32) -> Self {
        if home_goals > away_goals {
            Outcome::Home
        } else if home_goals < away_goals {
            Outcome::Away
        } else {
            Outcome::Draw
        }
    }
}

/// A three-way probability distribution. Constructors normalize so the
/// contract `p_h+p_d+p_a = 1 ± 1e-6` always holds on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self { home, draw, away }.normalized()
    }

    pub fn normalized(self) -> Self {
        let sum = (self.home + self.draw + self.away).max(1e-12);
        Self {
            home: self.home / sum,
            draw: self.draw / sum,
            away: self.away / sum,
        }
    }

    pub fn argmax(self) -> Outcome {
        if self.home >= self.draw && self.home >= self.away {
            Outcome::Home
        } else if self.draw >= self.away {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }

    pub fn get(self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn one_hot(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Home => Self {
                home: 1.0,
                draw: 0.0,
                away: 0.0,
            },
            Outcome::Draw => Self {
                home: 0.0,
                draw: 1.0,
                away: 0.0,
            },
            Outcome::Away => Self {
                home: 0.0,
                draw: 0.0,
                away: 1.0,
            },
        }
    }

    /// Shannon entropy of the distribution in bits, in `[0, log2(3)]`.
    pub fn entropy(self) -> f64 {
        [self.home, self.draw, self.away]
            .iter()
            .filter(|p| **p > 0.0)
            .map(|p| -p * p.log2())
            .sum()
    }
}
