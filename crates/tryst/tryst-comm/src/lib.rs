mod communicator;
mod state;

pub use communicator::Communicator;
pub use state::Waiting;
