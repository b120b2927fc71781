//! Drag-and-drop coordination for the task board
//!
//! The coordinator tracks at most one active drag. A completed drag yields at
//! most one [`DragIntent`]: either a status write for a move between columns
//! or a full-column order batch for a move within a column.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::{column_ids, group_tasks};
use crate::status::StatusMapper;
use crate::types::{Column, Task};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// The column body, outside of any card.
    Column(String),
    /// A card; its column and index become the destination.
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOrder {
    pub task_id: String,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragIntent {
    StatusUpdate {
        task_id: String,
        status: String,
    },
    Reorder {
        column_id: String,
        orders: Vec<TaskOrder>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDrag {
    pub task_id: String,
    pub source_column: String,
    pub hover: Option<DropTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

#[derive(Debug, Clone)]
pub struct DragReorderCoordinator {
    columns: Vec<Column>,
    mapper: StatusMapper,
    state: DragState,
}

impl DragReorderCoordinator {
    pub fn new(columns: Vec<Column>, mapper: StatusMapper) -> Self {
        Self {
            columns,
            mapper,
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match &self.state {
            DragState::Dragging(active) => Some(active),
            DragState::Idle => None,
        }
    }

    /// Picks up `task_id`. Returns false and stays idle if the task is unknown.
    pub fn start(&mut self, task_id: &str, tasks: &[Task]) -> bool {
        let Some(task) = tasks.iter().find(|task| task.id == task_id) else {
            warn!(task_id, "drag started on unknown task; ignoring");
            self.state = DragState::Idle;
            return false;
        };

        if let DragState::Dragging(previous) = &self.state {
            debug!(
                previous = previous.task_id.as_str(),
                "new drag replaces unfinished drag"
            );
        }

        let ids = column_ids(&self.columns);
        let source_column = self.mapper.map_status(task.status.as_deref(), &ids);
        debug!(task_id, source_column = source_column.as_str(), "drag started");
        self.state = DragState::Dragging(ActiveDrag {
            task_id: task_id.to_string(),
            source_column,
            hover: None,
        });
        true
    }

    /// Records the hover target. Visual feedback only; nothing is emitted.
    pub fn hover(&mut self, target: Option<DropTarget>) {
        if let DragState::Dragging(active) = &mut self.state {
            active.hover = target;
        }
    }

    pub fn cancel(&mut self) {
        if let DragState::Dragging(active) = &self.state {
            debug!(task_id = active.task_id.as_str(), "drag cancelled");
        }
        self.state = DragState::Idle;
    }

    /// Completes the active drag against the current task list.
    ///
    /// Positions within a column follow each task's stored `order`.
    /// Always returns the coordinator to idle. `None` means nothing changed:
    /// no active drag, no target, a stale task reference, or a drop onto the
    /// task's own position.
    pub fn end(&mut self, target: Option<DropTarget>, tasks: &[Task]) -> Option<DragIntent> {
        let DragState::Dragging(active) = std::mem::take(&mut self.state) else {
            debug!("drop without an active drag");
            return None;
        };

        let Some(target) = target else {
            debug!(
                task_id = active.task_id.as_str(),
                "dropped outside any column"
            );
            return None;
        };

        let buckets = group_tasks(tasks, &self.columns, &self.mapper).sorted_by_order();
        let Some((current_column, old_index)) = buckets.position_of(&active.task_id) else {
            warn!(
                task_id = active.task_id.as_str(),
                "dragged task no longer present; aborting drop"
            );
            return None;
        };

        let (target_column, new_index) = match &target {
            DropTarget::Column(column_id) => {
                if buckets.get(column_id).is_none() {
                    warn!(column_id = column_id.as_str(), "drop on unknown column");
                    return None;
                }
                (column_id.as_str(), None)
            }
            DropTarget::Task(over_id) => match buckets.position_of(over_id) {
                Some((column, index)) => (column, Some(index)),
                None => {
                    warn!(over_id = over_id.as_str(), "drop on unknown task");
                    return None;
                }
            },
        };

        if target_column != active.source_column || target_column != current_column {
            if let Some(bucket) = buckets.iter().find(|b| b.column.id == target_column)
                && let Some(limit) = bucket.column.wip_limit
                && bucket.tasks.len() >= limit
            {
                info!(
                    column_id = target_column,
                    limit, "moving task into a column at its WIP limit"
                );
            }
            return Some(DragIntent::StatusUpdate {
                task_id: active.task_id,
                status: target_column.to_string(),
            });
        }

        let new_index = new_index?;
        if new_index == old_index {
            return None;
        }

        let mut column_tasks: Vec<&Task> = buckets.get(current_column)?.iter().collect();
        array_move(&mut column_tasks, old_index, new_index);
        let orders = column_tasks
            .iter()
            .enumerate()
            .map(|(order, task)| TaskOrder {
                task_id: task.id.clone(),
                order,
            })
            .collect();

        Some(DragIntent::Reorder {
            column_id: current_column.to_string(),
            orders,
        })
    }

    /// Applies `intent` to an in-memory list. Returns false when nothing matched.
    ///
    /// A task moved to another column lands after that column's last card.
    pub fn apply(&self, tasks: &mut [Task], intent: &DragIntent) -> bool {
        match intent {
            DragIntent::StatusUpdate { task_id, status } => {
                let ids = column_ids(&self.columns);
                let next_order = tasks
                    .iter()
                    .filter(|task| &task.id != task_id)
                    .filter(|task| {
                        self.mapper.map_status(task.status.as_deref(), &ids) == *status
                    })
                    .map(|task| task.order + 1)
                    .max()
                    .unwrap_or(0);
                match tasks.iter_mut().find(|task| &task.id == task_id) {
                    Some(task) => {
                        task.status = Some(status.clone());
                        task.order = next_order;
                        true
                    }
                    None => false,
                }
            }
            DragIntent::Reorder { orders, .. } => {
                let mut applied = false;
                for entry in orders {
                    if let Some(task) = tasks.iter_mut().find(|task| task.id == entry.task_id) {
                        task.order = entry.order as i64;
                        applied = true;
                    }
                }
                applied
            }
        }
    }
}

/// Removes the item at `from` and reinserts it at `to`.
///
/// Out-of-range `from` is a no-op; `to` is clamped to the end.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
}
