// Client module
pub mod context;
pub mod network;

pub use context::ClientContext;
pub use network::{ChannelInfo, Network, Peer, ProfileNetwork};
