//! Navigation handling: the request model, the URL classifier and the
//! enactor that carries out each classification.

mod action;
mod classifier;
mod enactor;
mod request;

pub use action::{ClassifiedAction, DebuggerAction, PseudoCommand};
pub use classifier::Classifier;
pub use request::{NavigationRequest, NavigationTrigger};
