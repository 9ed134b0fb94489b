//! Fixed-size page framing shared by every page in the store: the node
//! header tag and the CRC32 checksum trailer. Node-specific layout (leaf
//! entries vs. internal entries) lives in [`crate::node`].

use crate::error::{TreeError, TreeResult};
use crc32fast::Hasher;

pub type PageId = u32;

/// `node_type(1) + used_entries(2) + next_page(4)`.
pub const PAGE_HEADER_SIZE: usize = 7;
pub const CHECKSUM_SIZE: usize = 4;

/// Metadata page is always page 1; node pages start at 2.
pub const METADATA_PAGE_ID: PageId = 1;
pub const FIRST_NODE_PAGE_ID: PageId = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    Leaf = 1,
    Internal = 2,
}

impl NodeType {
    pub fn from_u8(value: u8) -> TreeResult<Self> {
        match value {
            1 => Ok(NodeType::Leaf),
            2 => Ok(NodeType::Internal),
            other => Err(TreeError::corrupted(format!("unknown node type tag {other}"))),
        }
    }
}

/// Checksum the region before the trailer and compare it to the trailer's
/// stored value. `page` must be exactly `page_size` bytes.
pub fn verify_checksum(page: &[u8]) -> TreeResult<()> {
    let split = page.len() - CHECKSUM_SIZE;
    let expected = u32::from_be_bytes(page[split..].try_into().unwrap());
    let actual = checksum(&page[..split]);
    if expected != actual {
        return Err(TreeError::corrupted(format!(
            "checksum mismatch: expected {expected:#010x}, computed {actual:#010x}"
        )));
    }
    Ok(())
}

/// Compute and write the checksum trailer over `page[..page.len() - 4]`.
pub fn write_checksum(page: &mut [u8]) {
    let split = page.len() - CHECKSUM_SIZE;
    let value = checksum(&page[..split]);
    page[split..].copy_from_slice(&value.to_be_bytes());
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_round_trips() {
        let mut page = vec![0u8; 64];
        page[0..10].copy_from_slice(b"0123456789");
        write_checksum(&mut page);
        assert!(verify_checksum(&page).is_ok());
    }

    #[test]
    fn checksum_detects_corruption() {
        let mut page = vec![0u8; 64];
        page[0..10].copy_from_slice(b"0123456789");
        write_checksum(&mut page);
        page[3] ^= 0xFF;
        assert!(verify_checksum(&page).is_err());
    }

    #[test]
    fn node_type_round_trips() {
        assert_eq!(NodeType::from_u8(1).unwrap(), NodeType::Leaf);
        assert_eq!(NodeType::from_u8(2).unwrap(), NodeType::Internal);
        assert!(NodeType::from_u8(9).is_err());
    }
}
