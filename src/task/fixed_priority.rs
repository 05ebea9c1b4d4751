use super::{SchedulingParameters, TaskDescriptor};
use crate::error::{Error, Result};

/// Largest admissible priority value.
pub const MAX_PRIORITY: u32 = 99;

/// Parameters of a task under fixed-priority scheduling.
///
/// Following the usual operating-system convention, numerically lower
/// values denote higher priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPriority {
    priority: u32,
}

impl FixedPriority {
    pub fn new(priority: u32) -> Self {
        FixedPriority { priority }
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// True if a task with these parameters delays a task with
    /// `other`'s parameters; ties interfere with each other.
    pub fn interferes_with(&self, other: &FixedPriority) -> bool {
        self.priority <= other.priority
    }
}

fn check_priority(task: &str, priority: u32) -> Result<()> {
    if priority > MAX_PRIORITY {
        return Err(Error::range_violation(
            task,
            format!("priority {} outside 0..={}", priority, MAX_PRIORITY),
        ));
    }
    Ok(())
}

impl SchedulingParameters for FixedPriority {
    fn validate(&self, task: &str) -> Result<()> {
        check_priority(task, self.priority)
    }
}

impl TaskDescriptor<FixedPriority> {
    pub fn priority(&self) -> u32 {
        self.params.priority
    }

    /// Change the priority and return the previous one.
    pub fn set_priority(&mut self, priority: u32) -> Result<u32> {
        check_priority(&self.name, priority)?;
        let old = std::mem::replace(&mut self.params.priority, priority);
        if old != priority {
            self.invalidate();
        }
        Ok(old)
    }
}
