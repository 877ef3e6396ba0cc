pub mod bridge;
pub mod protocol;
pub mod publisher;
pub mod remote;

pub use bridge::{BridgeOptions, ConnectionState, FoldOutcome, RemoteSignal, RemoteSyncBridge};
pub use protocol::{ChannelFrame, ChannelHub, RemoteEvent};
pub use publisher::HttpPublisher;
pub use remote::{spawn_subscriber, SubscriberOptions};

// Real-time sync between the local editor and the relay: the wire protocol,
// the in-process channel hub used by the relay, the outbound publisher and
// the supervised channel subscriber feeding the bridge.
