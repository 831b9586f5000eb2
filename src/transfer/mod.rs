//! Cross-mesh transfer sessions.

pub mod parallel;
pub mod session;
pub mod window_name;

pub use parallel::ParallelTransferSession;
pub use session::{TransferDirection, TransferSession, WindowPair};
pub use window_name::window_name_from_path;
