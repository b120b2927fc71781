//! Column bucketing of a flat task list

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::status::StatusMapper;
use crate::types::{Column, Task};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnBucket {
    pub column: Column,
    pub tasks: Vec<Task>,
}

impl ColumnBucket {
    pub fn is_over_limit(&self) -> bool {
        self.column
            .wip_limit
            .is_some_and(|limit| self.tasks.len() > limit)
    }
}

/// Per-column task lists in board order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ColumnBuckets {
    buckets: Vec<ColumnBucket>,
    /// Tasks that had nowhere to go because the board has no columns.
    unplaced: Vec<Task>,
}

impl ColumnBuckets {
    pub fn get(&self, column_id: &str) -> Option<&[Task]> {
        self.buckets
            .iter()
            .find(|bucket| bucket.column.id == column_id)
            .map(|bucket| bucket.tasks.as_slice())
    }

    pub fn buckets(&self) -> &[ColumnBucket] {
        &self.buckets
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnBucket> {
        self.buckets.iter()
    }

    pub fn unplaced(&self) -> &[Task] {
        &self.unplaced
    }

    pub fn total_len(&self) -> usize {
        self.buckets
            .iter()
            .map(|bucket| bucket.tasks.len())
            .sum::<usize>()
            + self.unplaced.len()
    }

    /// Column id and index within it for `task_id`.
    pub fn position_of(&self, task_id: &str) -> Option<(&str, usize)> {
        self.buckets.iter().find_map(|bucket| {
            bucket
                .tasks
                .iter()
                .position(|task| task.id == task_id)
                .map(|index| (bucket.column.id.as_str(), index))
        })
    }

    pub fn column_of(&self, task_id: &str) -> Option<&str> {
        self.position_of(task_id).map(|(column, _)| column)
    }

    pub fn over_limit(&self) -> Vec<&Column> {
        self.buckets
            .iter()
            .filter(|bucket| bucket.is_over_limit())
            .map(|bucket| &bucket.column)
            .collect()
    }

    /// Reorders every bucket by the tasks' stored `order`, keeping input
    /// order on ties.
    pub fn sorted_by_order(mut self) -> Self {
        for bucket in &mut self.buckets {
            bucket.tasks.sort_by_key(|task| task.order);
        }
        self
    }
}

pub fn column_ids(columns: &[Column]) -> Vec<&str> {
    columns.iter().map(|column| column.id.as_str()).collect()
}

/// Buckets `tasks` by mapped column in a single pass.
pub fn group_tasks(tasks: &[Task], columns: &[Column], mapper: &StatusMapper) -> ColumnBuckets {
    let ids = column_ids(columns);
    let index_by_id: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();

    let mut grouped = ColumnBuckets {
        buckets: columns
            .iter()
            .map(|column| ColumnBucket {
                column: column.clone(),
                tasks: Vec::new(),
            })
            .collect(),
        unplaced: Vec::new(),
    };

    for task in tasks {
        let column_id = mapper.map_status(task.status.as_deref(), &ids);
        match index_by_id.get(column_id.as_str()) {
            Some(index) => grouped.buckets[*index].tasks.push(task.clone()),
            None => grouped.unplaced.push(task.clone()),
        }
    }

    if !grouped.unplaced.is_empty() {
        warn!(
            count = grouped.unplaced.len(),
            "board has no columns; tasks left unplaced"
        );
    }

    grouped
}
