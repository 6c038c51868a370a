use std::convert::TryFrom;
use std::thread;
use tokio::time::Duration;

pub const DEFAULT_BALANCER_PORT: u16 = 4000;
pub const DEFAULT_STANDALONE_PORT: u16 = 3000;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Default)]
pub struct ClusterOptions {
    pub balancer_port: Option<u16>,
    pub worker_count: Option<usize>,
    pub call_timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct ClusterOptionsValidated {
    pub balancer_port: u16,
    pub worker_count: usize,
    pub call_timeout: Duration,
}

impl ClusterOptionsValidated {
    /// Worker `n` (1-based) listens right after the balancer's port.
    pub fn worker_port(&self, n: usize) -> u16 {
        self.balancer_port + n as u16
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.worker_count == 0 {
            return Err("Cluster needs at least one worker");
        }
        if self.balancer_port as usize + self.worker_count > u16::MAX as usize {
            return Err("Worker ports would run past 65535; lower the balancer port or worker count");
        }
        if self.call_timeout == Duration::from_millis(0) {
            return Err("Call timeout must be greater than zero");
        }

        Ok(())
    }
}

impl TryFrom<ClusterOptions> for ClusterOptionsValidated {
    type Error = &'static str;

    fn try_from(options: ClusterOptions) -> Result<Self, Self::Error> {
        let values = ClusterOptionsValidated {
            balancer_port: options.balancer_port.unwrap_or(DEFAULT_BALANCER_PORT),
            worker_count: options.worker_count.unwrap_or_else(default_worker_count),
            call_timeout: options.call_timeout.unwrap_or(DEFAULT_CALL_TIMEOUT),
        };

        values.validate()?;
        Ok(values)
    }
}

// One core stays with the primary.
fn default_worker_count() -> usize {
    let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(2);
    cores.saturating_sub(1).max(1)
}
