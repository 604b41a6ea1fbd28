//! Test helpers shared by unit tests.

use crate::define_component;
use crate::ecs::{Component, ComponentContext, ConfigError, InitContext, Message, UpdateError};

/// Records every message it is subscribed to, in delivery order.
#[derive(Default)]
pub(crate) struct MessageLog {
    topics: Vec<&'static str>,
    messages: Vec<Message>,
}

impl MessageLog {
    pub(crate) fn subscribed(topics: &[&'static str]) -> Self {
        Self {
            topics: topics.to_vec(),
            messages: Vec::new(),
        }
    }

    pub(crate) fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn topics(&self) -> Vec<&str> {
        self.messages.iter().map(Message::topic).collect()
    }

    pub(crate) fn count(&self, topic: &str) -> usize {
        self.messages.iter().filter(|m| m.topic() == topic).count()
    }
}

impl Component for MessageLog {
    fn init_component(&mut self, ctx: &mut InitContext<'_>) -> Result<(), ConfigError> {
        for topic in &self.topics {
            ctx.subscribe(topic);
        }
        Ok(())
    }

    fn on_message(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        message: &Message,
    ) -> Result<(), UpdateError> {
        self.messages.push(message.clone());
        Ok(())
    }
}
define_component!(MessageLog, "MessageLog");
