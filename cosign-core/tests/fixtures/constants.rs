#![allow(dead_code)]

pub const TEST_CHAIN_ID: u64 = 1;
pub const TEST_ACCOUNT_BYTE: u8 = 0x11;
pub const TEST_RECIPIENT_BYTE: u8 = 0x22;
pub const TEST_OUTSIDER_BYTE: u8 = 0xee;

/// Secret key bytes of the default owners; each key is `[byte; 32]`.
pub const TEST_OWNER_SECRETS: [u8; 4] = [0x01, 0x02, 0x03, 0x04];
pub const TEST_OUTSIDER_SECRET: u8 = 0x09;

pub const TEST_TRANSFER_WEI: u64 = 1_000_000_000_000_000_000;
pub const TEST_CALLDATA_HEX: &str = "0xdeadbeef";

/// Identifier of the reference transfer (chain 1, account 0x11.., to 0x22.., 1 ether,
/// data deadbeef, slot 5) under 1.3.0+ hashing rules.
pub const TEST_REFERENCE_IDENTIFIER: &str = "0x987bc38bc4dc57311ff60757cb7a7321e2c1109797d3dc4425a73d4c14dd9c60";
pub const TEST_REFERENCE_SLOT: u64 = 5;
