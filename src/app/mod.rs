// Application layer - Use case interactors

pub mod container;
pub mod discovery;
pub mod plan_interactor;
pub mod preview_interactor;
pub mod segment_interactor;
pub mod staging;

// Re-export interactors
pub use plan_interactor::PlanInteractor;
pub use preview_interactor::PreviewInteractor;
pub use segment_interactor::SegmentInteractor;
