//! Default values shared by configuration and code that runs without a config file

/// Connector defaults
pub mod connector {
    pub const NAME: &str = "qtp";

    /// Delay before a client connector retries a failed connection (milliseconds)
    pub const RECONNECT_DELAY_MS: u64 = 10_000;

    pub const THREAD_NAME_PREFIX: &str = "qtp-handler";

    pub const BIND_ADDRESS: &str = "0.0.0.0";

    /// 0 means "not bound", transports pick their own
    pub const PORT: u16 = 0;

    pub const MAX_CONNECTIONS: usize = 1024;

    pub const GRACEFUL_STOP_PERIOD_MS: u64 = 5_000;

    pub const GRACEFUL_CLOSE_PERCENTAGE: u8 = 100;
}

/// Message pump defaults
pub mod pump {
    /// Largest frame accepted from a peer (bytes)
    pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

    /// Bytes composed per retrieval pass before yielding to the transport
    pub const COMPOSE_BUFFER_LIMIT: usize = 64 * 1024;

    /// Worker park timeout while nothing is pending (milliseconds)
    pub const IDLE_PARK_MS: u64 = 1_000;
}
