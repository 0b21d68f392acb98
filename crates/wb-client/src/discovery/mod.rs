//! Discovery of running application instances

mod probe;
mod registry;
mod resolver;

pub use probe::{LivenessProbe, TcpProbe, WebSocketProbe};
pub use registry::SessionRegistry;
pub use resolver::EndpointResolver;
