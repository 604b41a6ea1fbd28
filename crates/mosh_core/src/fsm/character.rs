//! Character states shared by the player and the NPCs.

use crate::ecs::ConfigError;
use crate::fsm::{ActionBinding, AnimationProxy, CharacterInput, FiniteStateMachine, State};

pub const IDLE: &str = "idle";
pub const WALK: &str = "walk";
pub const RUN: &str = "run";
pub const ATTACK: &str = "attack";
pub const DEATH: &str = "death";

#[derive(Debug, Default)]
pub struct Idle;

impl State for Idle {
    fn update(&mut self, _dt: f32, input: &CharacterInput) -> Option<&'static str> {
        if input.is_moving() {
            Some(WALK)
        } else if input.space {
            Some(ATTACK)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct Walk;

impl State for Walk {
    fn update(&mut self, _dt: f32, input: &CharacterInput) -> Option<&'static str> {
        match (input.is_moving(), input.shift) {
            (true, true) => Some(RUN),
            (true, false) => None,
            (false, _) => Some(IDLE),
        }
    }
}

#[derive(Debug, Default)]
pub struct Run;

impl State for Run {
    fn update(&mut self, _dt: f32, input: &CharacterInput) -> Option<&'static str> {
        match (input.is_moving(), input.shift) {
            (true, true) => None,
            (true, false) => Some(WALK),
            (false, _) => Some(IDLE),
        }
    }
}

/// One-shot attack; returns to idle once the clip has played.
#[derive(Debug)]
pub struct Attack {
    action: ActionBinding,
}

impl Attack {
    pub fn new(proxy: &AnimationProxy) -> Self {
        Self {
            action: ActionBinding::new(proxy, ATTACK, false),
        }
    }
}

impl State for Attack {
    fn enter(&mut self, _previous: Option<&str>) {
        self.action.time = 0.0;
    }

    fn update(&mut self, dt: f32, _input: &CharacterInput) -> Option<&'static str> {
        if self.action.finished() {
            return Some(IDLE);
        }
        self.action.advance(dt);
        None
    }

    fn action(&self) -> Option<&ActionBinding> {
        Some(&self.action)
    }
}

/// Terminal. The clip plays once and holds its last frame.
#[derive(Debug)]
pub struct Death {
    action: ActionBinding,
}

impl Death {
    pub fn new(proxy: &AnimationProxy) -> Self {
        Self {
            action: ActionBinding::new(proxy, DEATH, false),
        }
    }
}

impl State for Death {
    fn update(&mut self, dt: f32, _input: &CharacterInput) -> Option<&'static str> {
        self.action.advance(dt);
        None
    }

    fn action(&self) -> Option<&ActionBinding> {
        Some(&self.action)
    }
}

/// idle / walk / run / attack / death
pub fn player_machine(proxy: AnimationProxy) -> Result<FiniteStateMachine, ConfigError> {
    let mut fsm = FiniteStateMachine::new(proxy);
    fsm.add_state(IDLE, |_| Box::new(Idle))?;
    fsm.add_state(WALK, |_| Box::new(Walk))?;
    fsm.add_state(RUN, |_| Box::new(Run))?;
    fsm.add_state(ATTACK, |proxy| Box::new(Attack::new(proxy)))?;
    fsm.add_state(DEATH, |proxy| Box::new(Death::new(proxy)))?;
    Ok(fsm)
}

/// idle / walk / death
pub fn npc_machine(proxy: AnimationProxy) -> Result<FiniteStateMachine, ConfigError> {
    let mut fsm = FiniteStateMachine::new(proxy);
    fsm.add_state(IDLE, |_| Box::new(Idle))?;
    fsm.add_state(WALK, |_| Box::new(Walk))?;
    fsm.add_state(DEATH, |proxy| Box::new(Death::new(proxy)))?;
    Ok(fsm)
}
