//! Protocol Constants
//!
//! Fixed sizes, well-known signatures and encoding conventions used by the
//! FAsset diamond tooling. These values follow EIP-2535 and the Solidity ABI
//! encoding and must not change between deployments.

/// Selector Encoding
pub mod selector {
    /// Selector width in bytes
    pub const LEN: usize = 4;

    /// Hex digits in an encoded selector (without prefix)
    pub const HEX_DIGITS: usize = LEN * 2;

    /// Prefix of hex-encoded selectors and addresses
    pub const HEX_PREFIX: &str = "0x";
}

/// Facet Addresses
pub mod address {
    /// Address width in bytes (EVM address)
    pub const LEN: usize = 20;

    /// The zero address, used as the facet of `Remove` cuts
    pub const ZERO: [u8; LEN] = [0u8; LEN];
}

/// Cut Actions (on-chain `IDiamond.FacetCutAction` discriminants)
pub mod action {
    /// Add new selectors
    pub const ADD: u8 = 0;
    /// Replace the facet of existing selectors
    pub const REPLACE: u8 = 1;
    /// Remove existing selectors
    pub const REMOVE: u8 = 2;
}

/// Well-known diamond signatures
pub mod signatures {
    /// `IDiamondCut.diamondCut`
    pub const DIAMOND_CUT: &str = "diamondCut((address,uint8,bytes4[])[],address,bytes)";

    /// `IDiamondLoupe.facets`
    pub const LOUPE_FACETS: &str = "facets()";

    /// `IDiamondLoupe.facetFunctionSelectors`
    pub const LOUPE_FACET_FUNCTION_SELECTORS: &str = "facetFunctionSelectors(address)";

    /// `IDiamondLoupe.facetAddresses`
    pub const LOUPE_FACET_ADDRESSES: &str = "facetAddresses()";

    /// `IDiamondLoupe.facetAddress`
    pub const LOUPE_FACET_ADDRESS: &str = "facetAddress(bytes4)";

    /// `IERC165.supportsInterface`
    pub const SUPPORTS_INTERFACE: &str = "supportsInterface(bytes4)";
}

/// Planning limits
pub mod limits {
    /// Maximum nesting depth of tuple parameters accepted by the signature parser
    pub const MAX_TUPLE_DEPTH: usize = 16;
}
