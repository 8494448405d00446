//! Kademlia node Id or a lookup target
use rand::Rng;
use sha1_smol::Sha1;
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

use crate::{Error, Result};

/// The size of node IDs in bytes.
pub const ID_SIZE: usize = 20;
/// The size of node IDs in bits, also the common prefix length of an Id with itself.
pub const ID_BITS: usize = ID_SIZE * 8;

/// Routing table id of the main DHT table.
pub const DEFAULT_RTID: Id = Id([0; ID_SIZE]);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
/// Kademlia node Id or a lookup target
pub struct Id([u8; ID_SIZE]);

impl Id {
    pub fn random() -> Id {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; ID_SIZE] = rng.gen();

        Id(random_bytes)
    }

    /// Create a new Id from some bytes. Returns Err if `bytes` is not of length
    /// [ID_SIZE](crate::common::ID_SIZE).
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Id> {
        let bytes = bytes.as_ref();
        if bytes.len() != ID_SIZE {
            return Err(Error::InvalidIdSize(bytes.len()));
        }

        let mut tmp: [u8; ID_SIZE] = [0; ID_SIZE];
        tmp.copy_from_slice(bytes);

        Ok(Id(tmp))
    }

    /// Derive an Id from arbitrary content, so every node agrees on the same
    /// Id for the same key or topic name.
    pub fn of_content<T: AsRef<[u8]>>(data: T) -> Id {
        let mut hasher = Sha1::new();
        hasher.update(data.as_ref());

        Id(hasher.digest().bytes())
    }

    /// Random Id sharing exactly `cpl` leading bits with `reference`.
    ///
    /// `cpl` is clamped to `ID_BITS`, in which case `reference` itself is returned.
    pub fn random_with_cpl(reference: &Id, cpl: usize) -> Id {
        if cpl >= ID_BITS {
            return *reference;
        }

        let mut id = Id::random();
        let byte = cpl / 8;
        let bit = cpl % 8;

        id.0[..byte].copy_from_slice(&reference.0[..byte]);

        // Keep the first `bit` bits of the reference, flip the next one.
        let keep_mask: u8 = !(0xff_u8 >> bit);
        let flip: u8 = 0x80 >> bit;
        id.0[byte] = (reference.0[byte] & keep_mask)
            | (!reference.0[byte] & flip)
            | (id.0[byte] & !(keep_mask | flip));

        id
    }

    /// XOR distance between this Id and another.
    pub fn distance(&self, other: &Id) -> Distance {
        let mut xor = [0_u8; ID_SIZE];

        for (i, byte) in xor.iter_mut().enumerate() {
            *byte = self.0[i] ^ other.0[i];
        }

        Distance(xor)
    }

    /// Common prefix length, the number of leading bits shared with `other`.
    ///
    /// Equal Ids share all [ID_BITS] bits.
    pub fn cpl(&self, other: &Id) -> usize {
        self.distance(other).leading_zeros()
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl From<[u8; ID_SIZE]> for Id {
    fn from(bytes: [u8; ID_SIZE]) -> Self {
        Id(bytes)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Id> {
        if s.len() != ID_SIZE * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidIdEncoding(s.to_string()));
        }

        let mut bytes = [0_u8; ID_SIZE];

        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidIdEncoding(s.to_string()))?;
        }

        Ok(Id(bytes))
    }
}

/// XOR distance between two [Id]s.
///
/// Ordered as a big-endian unsigned integer, most significant byte first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Distance([u8; ID_SIZE]);

impl Distance {
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Leading zero bits, equal to the common prefix length of the two Ids.
    pub fn leading_zeros(&self) -> usize {
        let mut zeros = 0;

        for byte in self.0 {
            let lz = byte.leading_zeros() as usize;
            zeros += lz;

            if lz != 8 {
                break;
            }
        }

        zeros
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }
}

impl Debug for Distance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Distance({})", Id(self.0))
    }
}

/// The size of broadcast message ids in bytes.
pub const MESSAGE_ID_SIZE: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
/// Identifier of a broadcast message, unrelated to the Kademlia keyspace.
pub struct MessageId(pub [u8; MESSAGE_ID_SIZE]);

impl MessageId {
    pub fn random() -> MessageId {
        MessageId(rand::thread_rng().gen())
    }

    pub fn as_bytes(&self) -> &[u8; MESSAGE_ID_SIZE] {
        &self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        for _ in 0..100 {
            let a = Id::random();
            let b = Id::random();

            assert_eq!(a.distance(&b), b.distance(&a));
            assert!(!a.distance(&b).is_zero());
            assert!(a.distance(&a).is_zero());
        }
    }

    #[test]
    fn cpl_of_self_is_full_length() {
        let id = Id::random();
        assert_eq!(id.cpl(&id), ID_BITS);
    }

    #[test]
    fn cpl() {
        let a = Id::from_str("0000000000000000000000000000000000000000").unwrap();
        let b = Id::from_str("8000000000000000000000000000000000000000").unwrap();
        let c = Id::from_str("0100000000000000000000000000000000000000").unwrap();
        let d = Id::from_str("0000000000000000000000000000000000000001").unwrap();

        assert_eq!(a.cpl(&b), 0);
        assert_eq!(a.cpl(&c), 7);
        assert_eq!(a.cpl(&d), 159);
    }

    #[test]
    fn random_with_cpl() {
        for _ in 0..1000 {
            let cpl = rand::thread_rng().gen_range(0..ID_BITS);
            let reference = Id::random();
            let id = Id::random_with_cpl(&reference, cpl);

            assert_eq!(reference.cpl(&id), cpl);
        }
    }

    #[test]
    fn cpl_and_distance_agree() {
        let target = Id::random();

        for _ in 0..500 {
            let a = Id::random_with_cpl(&target, rand::thread_rng().gen_range(0..40));
            let b = Id::random_with_cpl(&target, rand::thread_rng().gen_range(0..40));

            let (cpl_a, cpl_b) = (a.cpl(&target), b.cpl(&target));

            if cpl_a < cpl_b {
                assert!(a.distance(&target) > b.distance(&target));
            } else if cpl_a > cpl_b {
                assert!(a.distance(&target) < b.distance(&target));
            }
        }
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(matches!(
            Id::from_bytes([0; 19]),
            Err(Error::InvalidIdSize(19))
        ));
        assert!(matches!(
            Id::from_bytes([0; 21]),
            Err(Error::InvalidIdSize(21))
        ));
        assert!(Id::from_bytes([7; ID_SIZE]).is_ok());
    }

    #[test]
    fn of_content_is_deterministic() {
        assert_eq!(Id::of_content("topic"), Id::of_content(b"topic"));
        assert_ne!(Id::of_content("topic"), Id::of_content("other"));

        // sha1("abc")
        assert_eq!(
            Id::of_content("abc").to_string(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn hex_round_trip() {
        let id = Id::random();
        assert_eq!(Id::from_str(&id.to_string()).unwrap(), id);
        assert!(Id::from_str("zz").is_err());
    }

    #[test]
    fn rejects_signed_hex() {
        assert!(matches!(
            Id::from_str(&"+a".repeat(ID_SIZE)),
            Err(Error::InvalidIdEncoding(_))
        ));
        assert!(matches!(
            Id::from_str(&format!("-{}", "0".repeat(ID_SIZE * 2 - 1))),
            Err(Error::InvalidIdEncoding(_))
        ));
        assert!(Id::from_str(&"Ab".repeat(ID_SIZE)).is_ok());
    }

    #[test]
    fn message_id_display() {
        let id = MessageId([0xab; MESSAGE_ID_SIZE]);
        assert_eq!(id.to_string(), "ab".repeat(MESSAGE_ID_SIZE));
        assert_ne!(MessageId::random(), MessageId::random());
    }
}
