mod proxy;
mod round_robin;

pub use proxy::Balancer;
pub use proxy::NoWorkers;
pub use round_robin::RoundRobin;
