mod coordinator;

pub use coordinator::{RefreshCoordinator, RefreshResult, RefreshRole, RefreshWaiter, SettleGuard};
