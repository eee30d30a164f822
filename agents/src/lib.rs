pub mod agent;
pub mod random;
pub mod chaos;

pub use agent::{price, Agent};
pub use chaos::ChaosAgent;
pub use random::RandomAgent;
