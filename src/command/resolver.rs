//! 命令 Resolver：与查询 Resolver 相同的首个匹配规则

use std::sync::Arc;

use crate::command::{Command, CommandManager, CommandManagerImpl, Trigger};
use crate::core::CoreError;

#[derive(Clone, Default)]
pub struct CommandResolver {
    managers: Vec<Arc<dyn CommandManager>>,
}

impl CommandResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, manager: impl CommandManager + 'static) {
        self.managers.push(Arc::new(manager));
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    pub fn get_trigger<C: Command>(&self, command: C) -> Result<Trigger<C::Input, C::Data>, CoreError> {
        let manager = self
            .managers
            .iter()
            .find(|m| m.matches(C::KIND))
            .ok_or_else(|| CoreError::NoCommandManager(C::KIND.to_string()))?;
        let manager = manager
            .as_any()
            .downcast_ref::<CommandManagerImpl<C>>()
            .ok_or_else(|| CoreError::ManagerMismatch(C::KIND.to_string()))?;
        Ok(manager.get_trigger(command))
    }
}
