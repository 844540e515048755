mod ids;
mod message;
mod node;
mod peerq;
mod stage;
mod timestamp;
mod tx;

pub use message::MessageKind;
pub use node::Node;
pub use peerq::PeerQ;
pub use stage::Stage;
pub use tx::Tx;
