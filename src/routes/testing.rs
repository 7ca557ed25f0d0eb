//! Builders for synthetic routing-socket dumps.

use super::AddressFamily;
use super::wire::{AF_INET, AF_INET6, RT_MSGHDR2_LEN, roundup};

/// Flags of an ordinary route that survives filtering
pub(crate) const USABLE: i32 = super::wire::RTF_UP | super::wire::RTF_STATIC;

const RTM_VERSION: u8 = 5;
const RTM_GET2: u8 = 0x14;

/// One `rt_msghdr2` message; sockaddrs must be added in slot order
pub(crate) struct MessageBuilder {
    index: u16,
    flags: i32,
    addrs: i32,
    trailer: Vec<u8>,
}

impl MessageBuilder {
    pub(crate) fn new(index: u16, flags: i32) -> Self {
        MessageBuilder {
            index,
            flags,
            addrs: 0,
            trailer: Vec::new(),
        }
    }

    pub(crate) fn sockaddr(mut self, slot: usize, sockaddr: Vec<u8>) -> Self {
        self.addrs |= 1 << slot;
        let padded = roundup(sockaddr[0] as usize).max(sockaddr.len());
        self.trailer.extend_from_slice(&sockaddr);
        self.trailer.resize(self.trailer.len() + padded - sockaddr.len(), 0);
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let len = RT_MSGHDR2_LEN + self.trailer.len();
        let mut buf = vec![0u8; RT_MSGHDR2_LEN];
        buf[0..2].copy_from_slice(&(len as u16).to_ne_bytes());
        buf[2] = RTM_VERSION;
        buf[3] = RTM_GET2;
        buf[4..6].copy_from_slice(&self.index.to_ne_bytes());
        buf[8..12].copy_from_slice(&self.flags.to_ne_bytes());
        buf[12..16].copy_from_slice(&self.addrs.to_ne_bytes());
        buf.extend(self.trailer);
        buf
    }
}

pub(crate) fn sockaddr_in(addr: [u8; 4]) -> Vec<u8> {
    let mut sa = vec![0u8; 16];
    sa[0] = 16;
    sa[1] = AF_INET;
    sa[4..8].copy_from_slice(&addr);
    sa
}

pub(crate) fn sockaddr_in6(addr: [u8; 16]) -> Vec<u8> {
    let mut sa = vec![0u8; 28];
    sa[0] = 28;
    sa[1] = AF_INET6;
    sa[8..24].copy_from_slice(&addr);
    sa
}

/// Netmask in the kernel's compact form: trailing zero bytes dropped,
/// `sa_len` covering only the significant ones
pub(crate) fn netmask_sockaddr(family: AddressFamily, mask: &[u8]) -> Vec<u8> {
    let significant = mask.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let offset = family.address_offset();
    let sa_len = if significant == 0 { 0 } else { offset + significant };
    let mut sa = vec![0u8; sa_len.max(2)];
    sa[0] = sa_len as u8;
    if significant > 0 {
        sa[offset..].copy_from_slice(&mask[..significant]);
    }
    sa
}

/// Concatenate messages into one dump
pub(crate) fn dump(messages: impl IntoIterator<Item = Vec<u8>>) -> Vec<u8> {
    messages.into_iter().flatten().collect()
}
