pub mod connection;
pub mod dispatcher;
pub mod presence;
pub mod relay;

use uuid::Uuid;

/// Opaque identifier of one live connection. Assigned when the socket is
/// accepted, never reused, invalid after disconnect.
pub type ConnId = Uuid;
