// Application layer - Use case interactors

pub mod clip_interactor;
pub mod container;
pub mod library_interactor;
pub mod session;

// Re-export interactors
pub use clip_interactor::{ClipInteractor, ClipReport, ClipSettings, GenerateRequest};
pub use container::{AppContainer, DefaultAppContainer, Ports};
pub use library_interactor::LibraryInteractor;
pub use session::{CleanupScheduler, SessionManager};
