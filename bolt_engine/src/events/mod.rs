mod dispatcher;
mod event_types;

pub use dispatcher::{DispatchError, EventDispatcher, EventProducer, Handler};
pub use event_types::*;
