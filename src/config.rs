use std::{rc::Rc, time::Duration};

/// Per-server emission settings.
///
/// Cheap to clone; one instance is shared by every connection a worker
/// accepts.
pub struct ServiceConfig(Rc<Inner>);

#[derive(Debug)]
struct Inner {
    outbound_buffer_size: usize,
    write_min_throughput: u64,
    write_timeout: Duration,
    keep_alive_enabled: bool,
}

impl Clone for ServiceConfig {
    fn clone(&self) -> Self {
        ServiceConfig(Rc::clone(&self.0))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(16 * 1024, 1024, Duration::from_secs(30), true)
    }
}

impl ServiceConfig {
    /// Create instance of `ServiceConfig`.
    ///
    /// A `write_min_throughput` of zero disables throughput policing; a zero
    /// `write_timeout` disables the writability deadline.
    pub fn new(
        outbound_buffer_size: usize,
        write_min_throughput: u64,
        write_timeout: Duration,
        keep_alive_enabled: bool,
    ) -> ServiceConfig {
        ServiceConfig(Rc::new(Inner {
            outbound_buffer_size,
            write_min_throughput,
            write_timeout,
            keep_alive_enabled,
        }))
    }

    /// High watermark for the outbound queue, in bytes. The pipeline drains
    /// the connection before reading more body once this is exceeded.
    #[inline]
    pub fn outbound_buffer_size(&self) -> usize {
        self.0.outbound_buffer_size
    }

    /// Minimum observed client download rate, in bytes per second.
    #[inline]
    pub fn write_min_throughput(&self) -> u64 {
        self.0.write_min_throughput
    }

    /// How long a single writability wait may last.
    #[inline]
    pub fn write_timeout(&self) -> Duration {
        self.0.write_timeout
    }

    /// Return state of connection keep-alive functionality.
    #[inline]
    pub fn keep_alive_enabled(&self) -> bool {
        self.0.keep_alive_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.outbound_buffer_size(), 16 * 1024);
        assert_eq!(config.write_min_throughput(), 1024);
        assert_eq!(config.write_timeout(), Duration::from_secs(30));
        assert!(config.keep_alive_enabled());
    }
}
