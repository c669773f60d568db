//! In-memory mirror of a user's tasks for the lifetime of one view.
//!
//! The server stays authoritative. `TaskBoard` only applies the results the
//! API returned, and `InFlight` keeps each action to one outstanding call.

use std::collections::HashSet;

use uuid::Uuid;

use crate::types::Task;

#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    in_flight: HashSet<BoardAction>,
}

/// A user action that may have one call outstanding at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardAction {
    Create,
    Update(Uuid),
    Toggle(Uuid),
    Delete(Uuid),
}

impl TaskBoard {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            in_flight: HashSet::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed).count()
    }

    /// Replace the mirror with a freshly listed page.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Newest first, like the list endpoint.
    pub fn insert_created(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    /// Swap in the server's copy of an edited or toggled task. Returns
    /// `false` when the task is not on the board.
    pub fn apply_updated(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Mark `action` as outstanding. `false` means a call for the same
    /// action is already in flight and the new trigger must be ignored.
    pub fn begin(&mut self, action: BoardAction) -> bool {
        self.in_flight.insert(action)
    }

    pub fn finish(&mut self, action: BoardAction) {
        self.in_flight.remove(&action);
    }

    pub fn is_in_flight(&self, action: BoardAction) -> bool {
        self.in_flight.contains(&action)
    }

    /// Run `call` for `action` unless one is already outstanding. The flag is
    /// cleared whatever the outcome; `None` means the trigger was ignored.
    pub fn guarded<R>(
        &mut self,
        action: BoardAction,
        call: impl FnOnce(&mut Self) -> R,
    ) -> Option<R> {
        if !self.begin(action) {
            return None;
        }
        let result = call(self);
        self.finish(action);
        Some(result)
    }
}
