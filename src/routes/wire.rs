// Routing socket message layout as produced by the Darwin NET_RT_DUMP2 sysctl
//
// Each message is an `rt_msghdr2` followed by the sockaddrs named in its
// `rtm_addrs` bitmask, each padded to a 4-byte boundary.

/// Route usable
pub const RTF_UP: i32 = 0x1;
/// Manually added
pub const RTF_STATIC: i32 = 0x800;
/// Generated through cloning (ARP / neighbor cache and the like)
pub const RTF_WASCLONED: i32 = 0x20000;
/// Bound to an interface scope
pub const RTF_IFSCOPE: i32 = 0x100_0000;

pub const RTAX_DST: usize = 0;
pub const RTAX_GATEWAY: usize = 1;
pub const RTAX_NETMASK: usize = 2;
pub const RTAX_MAX: usize = 8;

pub const AF_INET: u8 = 2;
pub const AF_INET6: u8 = 30;

/// `sizeof(struct rt_msghdr2)`
pub const RT_MSGHDR2_LEN: usize = 92;

const MSGLEN_OFFSET: usize = 0;
const INDEX_OFFSET: usize = 4;
const FLAGS_OFFSET: usize = 8;
const ADDRS_OFFSET: usize = 12;

/// Sockaddr alignment inside routing messages
pub fn roundup(len: usize) -> usize {
    if len > 0 {
        1 + ((len - 1) | (size_of::<u32>() - 1))
    } else {
        size_of::<u32>()
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_ne_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_ne_bytes(raw)
}

/// Iterator over the self-delimited messages of a table dump
pub struct Messages<'a> {
    buf: &'a [u8],
}

impl<'a> Messages<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Messages { buf }
    }
}

impl<'a> Iterator for Messages<'a> {
    type Item = RouteMessage<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.buf.len() < MSGLEN_OFFSET + 2 {
                return None;
            }
            let len = read_u16(self.buf, MSGLEN_OFFSET) as usize;
            if len == 0 || len > self.buf.len() {
                tracing::warn!(
                    "Malformed routing message (length {}, {} bytes left), dropping rest of dump",
                    len,
                    self.buf.len()
                );
                self.buf = &[];
                return None;
            }

            let (record, rest) = self.buf.split_at(len);
            self.buf = rest;
            match RouteMessage::new(record) {
                Some(message) => return Some(message),
                None => tracing::debug!("Skipping short routing message ({} bytes)", len),
            }
        }
    }
}

/// View of one `rt_msghdr2` message and its trailing sockaddrs
#[derive(Debug, Clone, Copy)]
pub struct RouteMessage<'a> {
    bytes: &'a [u8],
}

impl<'a> RouteMessage<'a> {
    /// `None` if the record cannot hold a full header
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        (bytes.len() >= RT_MSGHDR2_LEN).then_some(RouteMessage { bytes })
    }

    pub fn index(&self) -> u32 {
        read_u16(self.bytes, INDEX_OFFSET) as u32
    }

    pub fn flags(&self) -> i32 {
        read_i32(self.bytes, FLAGS_OFFSET)
    }

    pub fn addrs(&self) -> i32 {
        read_i32(self.bytes, ADDRS_OFFSET)
    }

    fn trailer(&self) -> &'a [u8] {
        &self.bytes[RT_MSGHDR2_LEN..]
    }

    /// Family of the first sockaddr after the header
    pub fn family(&self) -> Option<u8> {
        self.trailer().get(1).copied()
    }

    /// Sockaddrs indexed by RTAX_* slot
    pub fn sockaddrs(&self) -> [Option<Sockaddr<'a>>; RTAX_MAX] {
        let mut slots = [None; RTAX_MAX];
        let mut rest = self.trailer();
        for (i, slot) in slots.iter_mut().enumerate() {
            if self.addrs() & (1 << i) == 0 {
                continue;
            }
            let Some(sockaddr) = Sockaddr::new(rest) else {
                break;
            };
            *slot = Some(sockaddr);
            rest = &rest[roundup(sockaddr.len()).min(rest.len())..];
        }
        slots
    }
}

/// View of one sockaddr, clamped to the bytes actually present
#[derive(Debug, Clone, Copy)]
pub struct Sockaddr<'a> {
    declared_len: u8,
    bytes: &'a [u8],
}

impl<'a> Sockaddr<'a> {
    fn new(rest: &'a [u8]) -> Option<Self> {
        let declared_len = *rest.first()?;
        let bytes = &rest[..(declared_len as usize).min(rest.len())];
        Some(Sockaddr {
            declared_len,
            bytes,
        })
    }

    /// `sa_len` as declared by the kernel
    pub fn len(&self) -> usize {
        self.declared_len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.declared_len == 0
    }

    pub fn family(&self) -> Option<u8> {
        self.bytes.get(1).copied()
    }

    /// Bytes from `offset` up to `sa_len` (or the end of the message)
    pub fn data_from(&self, offset: usize) -> &'a [u8] {
        self.bytes.get(offset..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::{MessageBuilder, USABLE, netmask_sockaddr, sockaddr_in};
    use crate::routes::AddressFamily;

    #[test]
    fn test_roundup() {
        assert_eq!(roundup(0), 4);
        assert_eq!(roundup(1), 4);
        assert_eq!(roundup(4), 4);
        assert_eq!(roundup(5), 8);
        assert_eq!(roundup(16), 16);
        assert_eq!(roundup(28), 28);
    }

    #[test]
    fn test_message_header_fields() {
        let buf = MessageBuilder::new(7, USABLE)
            .sockaddr(RTAX_DST, sockaddr_in([10, 0, 0, 0]))
            .build();
        let message = Messages::new(&buf).next().unwrap();
        assert_eq!(message.index(), 7);
        assert_eq!(message.flags(), USABLE);
        assert_eq!(message.addrs(), 1 << RTAX_DST);
        assert_eq!(message.family(), Some(AF_INET));
    }

    #[test]
    fn test_sockaddr_walk_skips_absent_slots() {
        let buf = MessageBuilder::new(1, USABLE)
            .sockaddr(RTAX_DST, sockaddr_in([10, 0, 0, 0]))
            .sockaddr(RTAX_GATEWAY, sockaddr_in([192, 168, 1, 1]))
            .sockaddr(RTAX_NETMASK, netmask_sockaddr(AddressFamily::Inet, &[255, 0, 0, 0]))
            .build();
        let slots = Messages::new(&buf).next().unwrap().sockaddrs();

        assert_eq!(slots[RTAX_DST].unwrap().data_from(4), &[10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(slots[RTAX_GATEWAY].unwrap().data_from(4)[..4], [192, 168, 1, 1]);
        let mask = slots[RTAX_NETMASK].unwrap();
        assert_eq!(mask.len(), 5);
        assert_eq!(mask.data_from(4), &[255]);
        assert!(slots[3..].iter().all(Option::is_none));
    }

    #[test]
    fn test_messages_iterates_all_records() {
        let mut buf = MessageBuilder::new(1, USABLE)
            .sockaddr(RTAX_DST, sockaddr_in([10, 0, 0, 1]))
            .build();
        buf.extend(
            MessageBuilder::new(2, USABLE)
                .sockaddr(RTAX_DST, sockaddr_in([10, 0, 0, 2]))
                .build(),
        );
        let indices: Vec<u32> = Messages::new(&buf).map(|m| m.index()).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_messages_stops_on_overlong_length() {
        let mut buf = MessageBuilder::new(1, USABLE)
            .sockaddr(RTAX_DST, sockaddr_in([10, 0, 0, 1]))
            .build();
        let mut bogus = MessageBuilder::new(2, USABLE)
            .sockaddr(RTAX_DST, sockaddr_in([10, 0, 0, 2]))
            .build();
        bogus[..2].copy_from_slice(&u16::MAX.to_ne_bytes());
        buf.extend(bogus);

        let indices: Vec<u32> = Messages::new(&buf).map(|m| m.index()).collect();
        assert_eq!(indices, vec![1]);
    }

    #[test]
    fn test_messages_stops_on_zero_length() {
        let buf = vec![0u8; 200];
        assert_eq!(Messages::new(&buf).count(), 0);
    }

    #[test]
    fn test_messages_skips_short_record() {
        let mut buf = vec![0u8; 8];
        buf[..2].copy_from_slice(&8u16.to_ne_bytes());
        buf.extend(
            MessageBuilder::new(3, USABLE)
                .sockaddr(RTAX_DST, sockaddr_in([10, 0, 0, 3]))
                .build(),
        );
        let indices: Vec<u32> = Messages::new(&buf).map(|m| m.index()).collect();
        assert_eq!(indices, vec![3]);
    }

    #[test]
    fn test_truncated_trailer_is_clamped() {
        let mut buf = MessageBuilder::new(1, USABLE)
            .sockaddr(RTAX_DST, sockaddr_in([10, 0, 0, 0]))
            .build();
        // Declare a netmask that is not there
        buf[12..16].copy_from_slice(&((1i32 << RTAX_DST) | (1 << RTAX_NETMASK)).to_ne_bytes());
        let slots = Messages::new(&buf).next().unwrap().sockaddrs();
        assert!(slots[RTAX_DST].is_some());
        assert!(slots[RTAX_NETMASK].is_none());
    }
}
