use thiserror::Error;

/// 引擎实例发现错误
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("No event engine partitions available")]
    NoPartitionsAvailable,

    #[error("No discovery strategy configured")]
    NotConfigured,

    #[error("Partition {partition} out of range, {partitions} known instances")]
    PartitionOutOfRange { partition: usize, partitions: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Hash error: {0}")]
    Hash(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
