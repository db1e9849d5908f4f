use crate::config::{ADDRESS_BITS, Config};

/// Splits an address into `| tag | set index | block offset |`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AddressLayout {
    block_bits: u32,
    set_bits: u32,
    set_index_mask: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    pub tag: u64,
    pub set_index: usize,
}

impl AddressLayout {
    pub fn new(config: &Config) -> Self {
        // both are powers of two, so ilog2 is exact
        let block_bits = config.block_size().ilog2();
        let set_bits = config.set_count().ilog2();

        Self {
            block_bits,
            set_bits,
            set_index_mask: (config.set_count() - 1) as u64,
        }
    }

    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }

    pub fn tag_bits(&self) -> u32 {
        ADDRESS_BITS - self.set_bits - self.block_bits
    }

    pub fn decode(&self, address: u64) -> DecodedAddress {
        let set_index = (address >> self.block_bits) & self.set_index_mask;
        // a shift by the full address width leaves no tag bits
        let tag = address
            .checked_shr(self.block_bits + self.set_bits)
            .unwrap_or(0);

        DecodedAddress {
            tag,
            set_index: set_index as usize,
        }
    }

    pub fn offset(&self, address: u64) -> u64 {
        address & !(!0u64 << self.block_bits)
    }

    /// Rebuilds the address of byte `offset` inside the block `decoded` names.
    pub fn encode(&self, decoded: DecodedAddress, offset: u64) -> u64 {
        let tag = decoded
            .tag
            .checked_shl(self.block_bits + self.set_bits)
            .unwrap_or(0);
        tag | ((decoded.set_index as u64) << self.block_bits) | offset
    }
}
