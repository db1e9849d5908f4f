use std::fmt;
use std::str::FromStr;

/// Width of a simulated address in bits.
pub const ADDRESS_BITS: u32 = u64::BITS;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be greater than 0")]
    Zero { name: &'static str },
    #[error("{name} must be a power of 2, got {value}")]
    NotPowerOfTwo { name: &'static str, value: usize },
    #[error("missing eviction policy (one of 'FIFO', 'LRU')")]
    MissingPolicy,
    #[error("invalid policy type '{0}' (one of 'FIFO', 'LRU')")]
    UnknownPolicy(String),
    #[error("{set_bits} set bits and {block_bits} block bits do not fit in a 64-bit address")]
    AddressTooNarrow { set_bits: u32, block_bits: u32 },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Policy {
    Fifo,
    Lru,
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIFO" => Ok(Policy::Fifo),
            "LRU" => Ok(Policy::Lru),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Fifo => f.write_str("FIFO"),
            Policy::Lru => f.write_str("LRU"),
        }
    }
}

/// Validated cache geometry and eviction policy.
///
/// A `Config` can only be obtained through [`Config::new`], so every value of
/// this type describes a cache that can actually be built.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    set_count: usize,
    associativity: usize,
    block_size: usize,
    policy: Policy,
}

impl Config {
    pub fn new(
        set_count: usize,
        associativity: usize,
        block_size: usize,
        policy: Option<Policy>,
    ) -> Result<Self, ConfigError> {
        let set_count = power_of_two("set count", set_count)?;
        if associativity == 0 {
            return Err(ConfigError::Zero {
                name: "lines per set",
            });
        }
        let block_size = power_of_two("block size", block_size)?;
        let policy = policy.ok_or(ConfigError::MissingPolicy)?;

        let set_bits = set_count.ilog2();
        let block_bits = block_size.ilog2();
        if set_bits + block_bits > ADDRESS_BITS {
            return Err(ConfigError::AddressTooNarrow {
                set_bits,
                block_bits,
            });
        }

        Ok(Self {
            set_count,
            associativity,
            block_size,
            policy,
        })
    }

    pub fn set_count(&self) -> usize {
        self.set_count
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Total capacity in bytes, saturating at `usize::MAX`.
    pub fn capacity(&self) -> usize {
        self.set_count
            .saturating_mul(self.associativity)
            .saturating_mul(self.block_size)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cache: {} sets, {} ways, {}B lines ({}B total)",
            self.policy,
            self.set_count,
            self.associativity,
            self.block_size,
            self.capacity()
        )
    }
}

fn power_of_two(name: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { name })
    } else if !value.is_power_of_two() {
        Err(ConfigError::NotPowerOfTwo { name, value })
    } else {
        Ok(value)
    }
}
