pub mod board;
pub mod board_file;
pub mod cli;
pub mod drag;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod scheduler;
pub mod settings;
pub mod status;
pub mod storage;
pub mod types;
pub mod ui_state;

pub use board::{ColumnBucket, ColumnBuckets, group_tasks};
pub use drag::{DragIntent, DragReorderCoordinator, DropTarget, TaskOrder};
pub use error::{PersistenceError, StorageError};
pub use persistence::{PersistenceConfig, PersistenceGuard};
pub use scheduler::{Clock, ManualClock, SystemClock};
pub use status::StatusMapper;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::{Column, Priority, Task};
