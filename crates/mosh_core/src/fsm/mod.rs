//! Finite state machine for character behavior.
//!
//! States are registered by name together with a factory. A fresh state is
//! built from its factory every time it is entered, so states carry no
//! leftovers from an earlier visit.

mod character;
mod state;

pub use character::{npc_machine, player_machine, Attack, Death, Idle, Run, Walk};
pub use character::{ATTACK, DEATH, IDLE, RUN, WALK};
pub use state::{ActionBinding, AnimationLibrary, AnimationProxy, CharacterInput, ClipInfo, State};

use crate::ecs::{ConfigError, LookupError};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Builds a state, given the shared animation proxy.
pub type StateFactory = Box<dyn Fn(&AnimationProxy) -> Box<dyn State>>;

struct Current {
    name: String,
    state: Box<dyn State>,
}

pub struct FiniteStateMachine {
    proxy: AnimationProxy,
    factories: HashMap<String, StateFactory>,
    current: Option<Current>,
}

impl FiniteStateMachine {
    pub fn new(proxy: AnimationProxy) -> Self {
        Self {
            proxy,
            factories: HashMap::new(),
            current: None,
        }
    }

    /// Register a state under `name`.
    pub fn add_state<F>(&mut self, name: &str, factory: F) -> Result<(), ConfigError>
    where
        F: Fn(&AnimationProxy) -> Box<dyn State> + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(ConfigError::DuplicateState {
                name: name.to_string(),
            });
        }
        self.factories.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    /// Switch to `name`.
    ///
    /// Unknown names leave the current state untouched. Re-entering the
    /// current state is a no-op.
    pub fn set_state(&mut self, name: &str) -> Result<(), LookupError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| LookupError::UnknownState {
                name: name.to_string(),
            })?;
        if self.current_name() == Some(name) {
            return Ok(());
        }

        let previous = self.current.take().map(|mut current| {
            current.state.exit();
            current.name
        });
        let mut state = factory(&self.proxy);
        state.enter(previous.as_deref());
        debug!(from = previous.as_deref().unwrap_or("-"), to = name, "state transition");
        self.current = Some(Current {
            name: name.to_string(),
            state,
        });
        Ok(())
    }

    /// Advance the current state and apply the transition it asks for.
    /// Does nothing before the first `set_state`.
    pub fn update(&mut self, dt: f32, input: &CharacterInput) -> Result<(), LookupError> {
        let Some(current) = self.current.as_mut() else {
            return Ok(());
        };
        match current.state.update(dt, input) {
            Some(next) => self.set_state(next),
            None => Ok(()),
        }
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_ref().map(|current| current.name.as_str())
    }

    pub fn current_action(&self) -> Option<&ActionBinding> {
        self.current.as_ref()?.state.action()
    }

    /// No state has been set yet (assets still loading).
    pub fn is_uninitialized(&self) -> bool {
        self.current.is_none()
    }

    pub fn is_in(&self, name: &str) -> bool {
        self.current_name() == Some(name)
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn proxy(&self) -> &AnimationProxy {
        &self.proxy
    }
}

impl fmt::Debug for FiniteStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut states: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        states.sort_unstable();
        f.debug_struct("FiniteStateMachine")
            .field("states", &states)
            .field("current", &self.current_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    /// Writes every hook call to a shared journal; optionally requests a
    /// transition on update.
    struct Recording {
        name: &'static str,
        journal: Journal,
        next: Option<&'static str>,
    }

    impl State for Recording {
        fn enter(&mut self, previous: Option<&str>) {
            self.journal.borrow_mut().push(format!(
                "enter {} from {}",
                self.name,
                previous.unwrap_or("none")
            ));
        }

        fn exit(&mut self) {
            self.journal.borrow_mut().push(format!("exit {}", self.name));
        }

        fn update(&mut self, _dt: f32, _input: &CharacterInput) -> Option<&'static str> {
            self.journal.borrow_mut().push(format!("update {}", self.name));
            self.next
        }
    }

    fn machine(journal: &Journal) -> FiniteStateMachine {
        let mut fsm = FiniteStateMachine::new(AnimationProxy::new());
        for (name, next) in [("a", Some("b")), ("b", None)] {
            let journal = journal.clone();
            fsm.add_state(name, move |_| {
                Box::new(Recording {
                    name,
                    journal: journal.clone(),
                    next,
                })
            })
            .unwrap();
        }
        fsm
    }

    #[test]
    fn transitions_exit_then_enter_once() {
        let journal = Journal::default();
        let mut fsm = machine(&journal);
        fsm.set_state("a").unwrap();
        fsm.set_state("b").unwrap();
        assert_eq!(
            *journal.borrow(),
            ["enter a from none", "exit a", "enter b from a"]
        );
        assert!(fsm.is_in("b"));
    }

    #[test]
    fn same_state_is_a_no_op() {
        let journal = Journal::default();
        let mut fsm = machine(&journal);
        fsm.set_state("a").unwrap();
        fsm.set_state("a").unwrap();
        assert_eq!(*journal.borrow(), ["enter a from none"]);
    }

    #[test]
    fn unknown_state_leaves_current_untouched() {
        let journal = Journal::default();
        let mut fsm = machine(&journal);
        fsm.set_state("a").unwrap();
        let err = fsm.set_state("zzz").unwrap_err();
        assert_eq!(err, LookupError::UnknownState { name: "zzz".into() });
        assert_eq!(fsm.current_name(), Some("a"));
        assert_eq!(journal.borrow().len(), 1);
    }

    #[test]
    fn duplicate_state_names_are_rejected() {
        let journal = Journal::default();
        let mut fsm = machine(&journal);
        let err = fsm
            .add_state("a", |_| Box::new(Idle::default()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateState { name } if name == "a"));
    }

    #[test]
    fn update_before_first_state_does_nothing() {
        let journal = Journal::default();
        let mut fsm = machine(&journal);
        assert!(fsm.is_uninitialized());
        fsm.update(0.1, &CharacterInput::default()).unwrap();
        assert!(journal.borrow().is_empty());
        assert!(fsm.is_uninitialized());
    }

    #[test]
    fn requested_transitions_are_applied() {
        let journal = Journal::default();
        let mut fsm = machine(&journal);
        fsm.set_state("a").unwrap();
        fsm.update(0.1, &CharacterInput::default()).unwrap();
        assert_eq!(
            *journal.borrow(),
            ["enter a from none", "update a", "exit a", "enter b from a"]
        );
        assert!(fsm.is_in("b"));
    }
}
