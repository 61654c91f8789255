use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::animation::{DEFAULT_ANIM_BASE, DEFAULT_ANIM_BASE_RELAX, DEFAULT_ANIM_BATTLE};
use crate::error::DomainError;

/// Catalog partition a chibi is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    #[default]
    Operator,
    Enemy,
}

impl Faction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Enemy => "enemy",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Faction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "operator" => Ok(Self::Operator),
            "enemy" => Ok(Self::Enemy),
            _ => Err(DomainError::parse(format!("invalid faction ({s})"))),
        }
    }
}

/// Which asset set a chibi uses. Base chibis walk, battle chibis fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    #[default]
    Base,
    Battle,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Battle => "battle",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Self::Base => Self::Battle,
            Self::Battle => Self::Base,
        }
    }

    /// Animation a freshly assigned chibi plays in this stance.
    pub fn default_animation(&self) -> &'static str {
        match self {
            Self::Base => DEFAULT_ANIM_BASE,
            Self::Battle => DEFAULT_ANIM_BATTLE,
        }
    }

    /// Animation to settle into after a walk ends.
    ///
    /// For base chibis this is not the default animation: the base default
    /// is "Move", and arriving into it would loop the walk forever.
    pub fn idle_animation(&self) -> &'static str {
        match self {
            Self::Base => DEFAULT_ANIM_BASE_RELAX,
            Self::Battle => DEFAULT_ANIM_BATTLE,
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stance {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" => Ok(Self::Base),
            "battle" => Ok(Self::Battle),
            _ => Err(DomainError::parse(format!("invalid chibi stance ({s})"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Front,
    Back,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "Front",
            Self::Back => "Back",
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facing {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            _ => Err(DomainError::parse(format!("invalid chibi facing ({s})"))),
        }
    }
}
