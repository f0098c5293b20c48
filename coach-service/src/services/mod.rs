//! Services module for coach-service.

pub mod clustering;
pub mod coach;
pub mod metrics;
pub mod providers;
pub mod repository;
pub mod selector;
pub mod session_store;

pub use clustering::{ClusterService, ClusterSettings};
pub use coach::CoachService;
pub use metrics::{get_metrics, init_metrics};
pub use repository::{CoachRepository, MemoryRepository, PgRepository};
pub use selector::{QuestionSelector, Selection, Strategy};
pub use session_store::SessionStore;
