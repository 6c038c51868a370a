//! Messages exchanged between the primary and its workers, and the framing that carries them
//! over a child process's stdin/stdout.
mod codec;
mod message;

pub use codec::ChannelError;
pub use codec::MessageReader;
pub use codec::MessageWriter;
pub use message::CorrelationId;
pub use message::Operation;
pub use message::Outcome;
pub use message::ToPrimary;
pub use message::ToWorker;
