//! `!chibi` command parsing.
//!
//! The interpreter turns one chat line plus the sender's current state into a
//! [`Command`]. It never touches the room: mutations happen on a working
//! copy that the caller commits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chibibot_domain::{
    clamp_f64, matches_keyword, Action, Facing, Faction, OperatorState, Stance, Vector2,
    DEFAULT_MOVE_ANIM,
};

use super::command::{Command, CommandError, InfoKind};
use crate::infrastructure::directory::is_valid_channel_name;
use crate::infrastructure::ports::{ChatMessage, NameMatch};
use crate::use_cases::operator_state::OperatorStateService;

pub const TRIGGER: &str = "!chibi";
const MAX_COMMAND_LEN: usize = 100;

pub const HELP_TEXT: &str = concat!(
    "!chibi to control your Arknights chibi. ",
    "\"!chibi Rockrock\" to change your operator. ",
    "\"!chibi play Move\", \"!chibi skin epoque#2\" to change the animation and skin. ",
    "\"!chibi skins\" and \"!chibi anims\" lists available skins and animations. ",
    "\"!chibi stance battle\" to change from base or battle chibis. ",
    "\"!chibi enemy mandragora\" to change into an enemy mob instead of an operator. ",
    "\"!chibi walk\" to have your chibi walk around the screen."
);

const USAGE_STANCE: &str = "try something like !chibi stance battle";
const USAGE_FACE: &str = "try something like !chibi face back";
const USAGE_FACE_VALUE: &str = "try something like !chibi face back or !chibi face front";
const USAGE_FACE_BASE_BACK: &str =
    "base chibi's can't face backwards. Try setting to battle stance first";
const USAGE_ENEMY: &str =
    "try something like !chibi enemy <enemyname or ID> (ie. !chibi enemy Avenger, !chibi enemy SM8";
const USAGE_WALK_TO: &str = "try something like !chibi walk 0.45";
const USAGE_WALK_PACE: &str = "try something like !chibi walk 0.1 0.5";
const USAGE_PACE: &str = "try something like !chibi pace 0.1 0.5";
const USAGE_SPEED: &str = "try something like !chibi speed 0.5";
const USAGE_SPEED_VALUE: &str = "try something like !chibi speed 1.5";
const USAGE_SIZE: &str = "try something like !chibi size 0.5";
const USAGE_SIZE_VALUE: &str = "try something like !chibi size 1.5";
const USAGE_MOVE_SPEED: &str = "try something like !chibi move_speed 120";
const USAGE_MOVE_SPEED_VALUE: &str = "try something like !chibi move_speed 360";
const USAGE_SAVE: &str = "try something like !chibi save";
const USAGE_UNSAVE: &str = "try something like !chibi unsave";
pub(crate) const USAGE_FOLLOW: &str = "try something like !chibi follow <username>";
const USAGE_WHO: &str = "try something like !chibi who steam knight";

type CommandResult = Result<Command, CommandError>;

/// True for lines addressed to the bot.
pub fn is_command(text: &str) -> bool {
    text.starts_with(TRIGGER)
}

/// Parses chat lines for one room.
pub struct CommandInterpreter {
    operators: Arc<OperatorStateService>,
    show_chat_messages: AtomicBool,
}

impl CommandInterpreter {
    pub fn new(operators: Arc<OperatorStateService>, show_chat_messages: bool) -> Self {
        Self {
            operators,
            show_chat_messages: AtomicBool::new(show_chat_messages),
        }
    }

    pub fn set_show_chat_messages(&self, value: bool) {
        self.show_chat_messages.store(value, Ordering::Relaxed);
    }

    pub fn show_chat_messages(&self) -> bool {
        self.show_chat_messages.load(Ordering::Relaxed)
    }

    pub fn interpret(&self, current: &OperatorState, message: &ChatMessage) -> CommandResult {
        let text = message.text.as_str();
        if !is_command(text) {
            if self.show_chat_messages() {
                return Ok(Command::ShowMessage(text.to_string()));
            }
            return Ok(Command::NoOp);
        }
        if text.len() >= MAX_COMMAND_LEN {
            return Ok(Command::NoOp);
        }

        let args: Vec<&str> = text.split(' ').filter(|s| !s.is_empty()).collect();
        if args.len() == 1 && args[0] == TRIGGER {
            return Ok(Command::Reply(HELP_TEXT.to_string()));
        }
        if args.first() != Some(&TRIGGER) {
            return Ok(Command::NoOp);
        }

        let mut state = current.clone();
        let verb = args[1].trim();
        tracing::debug!(user = %message.username, verb, "Interpreting chat command");

        match verb {
            "help" => Ok(Command::Reply(HELP_TEXT.to_string())),
            "skins" => Ok(Command::Info(InfoKind::Skins)),
            "anims" => Ok(Command::Info(InfoKind::Animations)),
            "info" => Ok(Command::Info(InfoKind::Summary)),
            "who" => self.who(&args),
            "find" => Ok(Command::Find),
            "skin" => self.set_skin(args.get(2).copied(), state),
            "anim" | "play" => set_animation(&args[2..], state),
            "stance" => self.set_stance(args.get(2).copied(), state),
            "face" => self.set_facing(&args, state),
            "enemy" => self.set_enemy(&args, state),
            "walk" => self.set_walk(&args, state),
            "pace" => self.set_pace(&args, state),
            "follow" => self.set_follow(&args, &message.username, state),
            "speed" => self.set_animation_speed(&args, state),
            "size" | "scale" => self.set_scale(&args, state),
            "move_speed" | "velocity" => self.set_move_speed(&args, state),
            "save" if args.len() == 2 => Ok(Command::SavePreferences(state)),
            "save" => Err(CommandError::Usage(USAGE_SAVE)),
            "unsave" if args.len() == 2 => Ok(Command::ClearPreferences),
            "unsave" => Err(CommandError::Usage(USAGE_UNSAVE)),
            other => {
                if matches_keyword(other, &state.available_animations).is_some() {
                    set_animation(&[other], state)
                } else if matches_keyword(other, &state.skins).is_some() {
                    self.set_skin(Some(other), state)
                } else if matches_keyword(other, &["base", "battle"]).is_some() {
                    self.set_stance(Some(other), state)
                } else {
                    self.set_model(&args[1..].join(" "), state)
                }
            }
        }
    }

    fn default_speed(&self) -> f64 {
        self.operators.config().default_animation_speed
    }

    fn set_skin(&self, name: Option<&str>, mut state: OperatorState) -> CommandResult {
        let Some(skin) = name
            .and_then(|n| matches_keyword(n, &state.skins))
            .map(str::to_string)
        else {
            return Ok(Command::NoOp);
        };
        state.skin = skin;
        state.animation_speed = self.default_speed();
        Ok(Command::Update(state))
    }

    fn set_stance(&self, value: Option<&str>, mut state: OperatorState) -> CommandResult {
        let stance: Stance = value
            .and_then(|v| v.parse().ok())
            .ok_or(CommandError::Usage(USAGE_STANCE))?;
        state.stance = stance;
        state.animation_speed = self.default_speed();
        Ok(Command::Update(state))
    }

    fn set_facing(&self, args: &[&str], mut state: OperatorState) -> CommandResult {
        let Some(value) = args.get(2) else {
            return Err(CommandError::Usage(USAGE_FACE));
        };
        let facing: Facing = value
            .parse()
            .map_err(|_| CommandError::Usage(USAGE_FACE_VALUE))?;
        if state.stance == Stance::Base && facing == Facing::Back {
            return Err(CommandError::Usage(USAGE_FACE_BASE_BACK));
        }
        state.facing = facing;
        state.animation_speed = self.default_speed();
        Ok(Command::Update(state))
    }

    fn set_enemy(&self, args: &[&str], mut state: OperatorState) -> CommandResult {
        if args.len() < 3 {
            return Err(CommandError::Usage(USAGE_ENEMY));
        }
        let name = args[2..].join(" ");
        let NameMatch::Found(enemy_id) = self.operators.resolve_name(name.trim(), Faction::Enemy)
        else {
            return Ok(Command::NoOp);
        };
        state.operator_id = enemy_id;
        state.faction = Faction::Enemy;
        state.animation_speed = self.default_speed();
        state.sprite_scale = None;
        Ok(Command::Update(state))
    }

    /// Switch to an operator by display name. Unresolved names do nothing.
    fn set_model(&self, name: &str, mut state: OperatorState) -> CommandResult {
        let NameMatch::Found(operator_id) =
            self.operators.resolve_name(name.trim(), Faction::Operator)
        else {
            return Ok(Command::NoOp);
        };

        // Only base operators can keep walking.
        if state.faction == Faction::Enemy && state.is_walking() {
            state.stance = Stance::Base;
        }
        state.operator_id = operator_id;
        state.faction = Faction::Operator;
        state.animation_speed = self.default_speed();
        state.sprite_scale = None;
        Ok(Command::Update(state))
    }

    fn set_walk(&self, args: &[&str], mut state: OperatorState) -> CommandResult {
        if state.faction == Faction::Operator {
            state.stance = Stance::Base;
        }
        let walk_animation = move_animation_for(&state);
        state.animation_speed = self.default_speed();

        let action = match args.len() {
            3 => {
                let x = parse_number(args[2], USAGE_WALK_TO)?;
                Action::WalkTo {
                    target: Some(Vector2::new(x, 0.0).clamped_unit()),
                    walk_animation,
                    arrival_animation: state.stance.idle_animation().to_string(),
                }
            }
            4 => {
                let start = parse_number(args[2], USAGE_WALK_PACE)?;
                let end = parse_number(args[3], USAGE_WALK_PACE)?;
                pace_action(start, end, walk_animation)
            }
            _ => Action::Wander {
                animation: walk_animation,
            },
        };
        state.set_action(action);
        Ok(Command::Update(state))
    }

    fn set_pace(&self, args: &[&str], mut state: OperatorState) -> CommandResult {
        if args.len() < 4 {
            return Err(CommandError::Usage(USAGE_PACE));
        }
        if state.faction == Faction::Operator {
            state.stance = Stance::Base;
        }
        let start = parse_number(args[2], USAGE_PACE)?;
        let end = parse_number(args[3], USAGE_PACE)?;

        let walk_animation = move_animation_for(&state);
        state.set_action(pace_action(start, end, walk_animation));
        state.animation_speed = self.default_speed();
        Ok(Command::Update(state))
    }

    fn set_follow(&self, args: &[&str], sender: &str, mut state: OperatorState) -> CommandResult {
        if args.len() != 3 {
            return Err(CommandError::Usage(USAGE_FOLLOW));
        }
        let target = args[2].to_lowercase();
        if !is_valid_channel_name(&target) || target == sender.to_lowercase() {
            return Err(CommandError::Usage(USAGE_FOLLOW));
        }

        if state.faction == Faction::Operator {
            state.stance = Stance::Base;
        }
        let walk_animation = move_animation_for(&state);
        state.set_action(Action::Follow {
            target,
            walk_animation,
            idle_animation: state.stance.idle_animation().to_string(),
        });
        state.animation_speed = self.default_speed();
        Ok(Command::Follow(state))
    }

    fn set_animation_speed(&self, args: &[&str], mut state: OperatorState) -> CommandResult {
        let Some(value) = args.get(2) else {
            return Err(CommandError::Usage(USAGE_SPEED));
        };
        let speed = parse_number(value, USAGE_SPEED_VALUE)?;
        let config = self.operators.config();
        state.animation_speed = clamp_f64(
            speed,
            config.min_animation_speed,
            config.max_animation_speed,
        );
        Ok(Command::Update(state))
    }

    fn set_scale(&self, args: &[&str], mut state: OperatorState) -> CommandResult {
        let Some(value) = args.get(2) else {
            return Err(CommandError::Usage(USAGE_SIZE));
        };
        let scale = parse_number(value, USAGE_SIZE_VALUE)?;
        let config = self.operators.config();
        let scale = clamp_f64(scale, config.min_scale_size, config.max_scale_size);
        state.sprite_scale = Some(Vector2::splat(scale));
        Ok(Command::Update(state))
    }

    fn set_move_speed(&self, args: &[&str], mut state: OperatorState) -> CommandResult {
        let Some(value) = args.get(2) else {
            return Err(CommandError::Usage(USAGE_MOVE_SPEED));
        };
        if *value == "default" {
            state.movement_speed = None;
            return Ok(Command::Update(state));
        }
        let speed = parse_number(value, USAGE_MOVE_SPEED_VALUE)?;
        let config = self.operators.config();
        let speed = clamp_f64(speed, config.min_movement_speed, config.max_movement_speed);
        state.movement_speed = Some(Vector2::splat(speed));
        Ok(Command::Update(state))
    }

    fn who(&self, args: &[&str]) -> CommandResult {
        if args.len() < 3 {
            return Err(CommandError::Usage(USAGE_WHO));
        }
        let name = args[2..].join(" ");
        tracing::debug!(name = %name, "Searching catalog");

        let Some(operators) = self.who_matches(&name, Faction::Operator) else {
            return Ok(Command::NoOp);
        };
        let Some(enemies) = self.who_matches(&name, Faction::Enemy) else {
            return Ok(Command::NoOp);
        };

        let reply = match (operators.is_empty(), enemies.is_empty()) {
            (true, true) => "Could not find any operators/enemies with that name".to_string(),
            (true, false) => format!("Did you mean enemies: {}", enemies.join(", ")),
            (false, true) => format!("Did you mean operators: {}", operators.join(", ")),
            (false, false) => format!(
                "Did you mean: {} or enemies {}",
                operators.join(", "),
                enemies.join(", ")
            ),
        };
        Ok(Command::Reply(reply))
    }

    fn who_matches(&self, name: &str, faction: Faction) -> Option<Vec<String>> {
        match self.operators.resolve_name(name, faction) {
            NameMatch::Found(id) => self
                .operators
                .display_name(&id, faction)
                .map(|name| vec![name]),
            NameMatch::Suggestions(names) => Some(names),
        }
    }
}

/// One or more animations to loop. With several names every one must match,
/// otherwise only the first is played.
fn set_animation(names: &[&str], mut state: OperatorState) -> CommandResult {
    let Some(first) = names
        .first()
        .and_then(|n| matches_keyword(n, &state.available_animations))
        .map(str::to_string)
    else {
        return Ok(Command::NoOp);
    };

    let mut animations = vec![first];
    if names.len() >= 2 {
        let all: Option<Vec<String>> = names
            .iter()
            .map(|n| matches_keyword(n, &state.available_animations).map(str::to_string))
            .collect();
        if let Some(all) = all {
            animations = all;
        }
    }
    state.set_action(Action::play(animations));
    Ok(Command::Update(state))
}

fn pace_action(start: f64, end: f64, animation: String) -> Action {
    Action::PaceAround {
        start: Some(Vector2::new(start, 0.0).clamped_unit()),
        end: Some(Vector2::new(end, 0.0).clamped_unit()),
        animation,
    }
}

/// Keep a move-like animation the action already uses, else find one.
fn move_animation_for(state: &OperatorState) -> String {
    let current = state.current_animations();
    let mut animation = current
        .iter()
        .find(|a| a.contains(DEFAULT_MOVE_ANIM))
        .cloned()
        .unwrap_or_else(|| DEFAULT_MOVE_ANIM.to_string());

    if !state.available_animations.contains(&animation) {
        if let Some(found) = state
            .available_animations
            .iter()
            .find(|a| a.contains(DEFAULT_MOVE_ANIM))
        {
            animation = found.clone();
        }
    }
    animation
}

fn parse_number(value: &str, usage: &'static str) -> Result<f64, CommandError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(CommandError::Usage(usage))
}
