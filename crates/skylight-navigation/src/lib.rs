//! Skylight Navigation Policy
//!
//! Classifies outgoing navigation, new-window and response events for a
//! browsing context and decides whether the target renders in place, is
//! handed to the system browser, or becomes a download.

mod classifier;
mod opener;
mod policy;

pub use classifier::LinkClassifier;
pub use opener::{PlatformOpener, RecordingOpener, SystemOpener};
pub use policy::{
    Disposition, EnginePolicy, NavigationKind, NavigationPolicy, NavigationRequest,
    NavigationResponse,
};
