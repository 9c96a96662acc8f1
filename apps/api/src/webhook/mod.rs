pub mod events;
pub mod handlers;
pub mod projector;

pub use projector::Projector;
