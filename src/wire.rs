//! Canonical wire encoding for every hashed or signed structure.
//!
//! Block ids, transaction signatures, DLEQ challenges and re-encrypted
//! share payloads are all computed over these bytes, so the encoding is
//! deterministic and strict: fixed field order, little-endian length
//! prefixes, 32-byte compressed points, 32-byte canonical scalars. Unknown
//! union tags and trailing bytes are rejected on decode.
//!
//! JSON (via `serde`) is used elsewhere for CLI file I/O only and is never
//! hashed.

use std::fmt;

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::{EdwardsPoint, Scalar};

use crate::crypto::dleq::DleqProof;
use crate::crypto::elgamal::ReencryptedShare;
use crate::crypto::poly::PubShare;
use crate::crypto::pvss::PubVerShare;
use crate::crypto::schnorr::SchnorrSignature;
use crate::ledger::{ForwardLink, SkipBlockFix};
use crate::protocol::messages::DecryptRequest;
use crate::transactions::{BlockData, LegacyWrite, ReadTxn, ReadTxnData, WriteTxn, WriteTxnData};

/// Decoding failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireError {
    /// Input ended before the declared content.
    Truncated,
    /// Bytes remained after the outermost structure.
    TrailingBytes(usize),
    /// Unknown block data tag.
    UnknownTag(u8),
    /// A 32-byte string did not decompress to a curve point.
    InvalidPoint,
    /// A 32-byte string was not a canonical scalar.
    InvalidScalar,
    /// A declared length exceeds the remaining input.
    Oversize { declared: usize, remaining: usize },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Truncated => write!(f, "truncated input"),
            WireError::TrailingBytes(n) => write!(f, "{n} trailing bytes after structure"),
            WireError::UnknownTag(tag) => write!(f, "unknown block data tag {tag}"),
            WireError::InvalidPoint => write!(f, "invalid point encoding"),
            WireError::InvalidScalar => write!(f, "non-canonical scalar encoding"),
            WireError::Oversize { declared, remaining } => {
                write!(f, "declared length {declared} exceeds remaining {remaining} bytes")
            }
        }
    }
}

impl std::error::Error for WireError {}

/// Append-only byte sink for canonical encoding.
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder::default()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_fixed32(&mut self, v: &[u8; 32]) {
        self.buf.extend_from_slice(v);
    }

    /// Length-prefixed byte string.
    pub fn put_bytes(&mut self, v: &[u8]) {
        self.put_u32(v.len() as u32);
        self.buf.extend_from_slice(v);
    }

    pub fn put_point(&mut self, p: &EdwardsPoint) {
        self.buf.extend_from_slice(p.compress().as_bytes());
    }

    pub fn put_scalar(&mut self, s: &Scalar) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Count-prefixed sequence.
    pub fn put_seq<T: Wire>(&mut self, items: &[T]) {
        self.put_u32(items.len() as u32);
        for item in items {
            item.encode(self);
        }
    }

    pub fn put_point_seq(&mut self, points: &[EdwardsPoint]) {
        self.put_u32(points.len() as u32);
        for p in points {
            self.put_point(p);
        }
    }
}

/// Strict cursor over an input buffer.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Decoder { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::Truncated);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn expect_end(&self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }

    pub fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32, WireError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().map_err(|_| WireError::Truncated)?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn u64(&mut self) -> Result<u64, WireError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(|_| WireError::Truncated)?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn fixed32(&mut self) -> Result<[u8; 32], WireError> {
        self.take(32)?.try_into().map_err(|_| WireError::Truncated)
    }

    /// A declared count or length, bounded by the remaining input so a
    /// corrupt prefix cannot drive a huge allocation.
    fn bounded_len(&mut self) -> Result<usize, WireError> {
        let declared = self.u32()? as usize;
        if declared > self.remaining() {
            return Err(WireError::Oversize {
                declared,
                remaining: self.remaining(),
            });
        }
        Ok(declared)
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.bounded_len()?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn point(&mut self) -> Result<EdwardsPoint, WireError> {
        CompressedEdwardsY(self.fixed32()?)
            .decompress()
            .ok_or(WireError::InvalidPoint)
    }

    pub fn scalar(&mut self) -> Result<Scalar, WireError> {
        Option::<Scalar>::from(Scalar::from_canonical_bytes(self.fixed32()?))
            .ok_or(WireError::InvalidScalar)
    }

    pub fn seq<T: Wire>(&mut self) -> Result<Vec<T>, WireError> {
        let count = self.bounded_len()?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(T::decode(self)?);
        }
        Ok(out)
    }

    pub fn point_seq(&mut self) -> Result<Vec<EdwardsPoint>, WireError> {
        let count = self.bounded_len()?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.point()?);
        }
        Ok(out)
    }
}

/// Canonical encoding of a protocol structure.
pub trait Wire: Sized {
    fn encode(&self, enc: &mut Encoder);
    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError>;

    fn marshal(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.encode(&mut enc);
        enc.finish()
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self, WireError> {
        let mut dec = Decoder::new(bytes);
        let value = Self::decode(&mut dec)?;
        dec.expect_end()?;
        Ok(value)
    }
}

impl Wire for DleqProof {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_scalar(&self.c);
        enc.put_scalar(&self.r);
        enc.put_point(&self.vg);
        enc.put_point(&self.vh);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(DleqProof {
            c: dec.scalar()?,
            r: dec.scalar()?,
            vg: dec.point()?,
            vh: dec.point()?,
        })
    }
}

impl Wire for PubShare {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u32(self.i as u32);
        enc.put_point(&self.v);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(PubShare {
            i: dec.u32()? as usize,
            v: dec.point()?,
        })
    }
}

impl Wire for PubVerShare {
    fn encode(&self, enc: &mut Encoder) {
        self.s.encode(enc);
        self.p.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(PubVerShare {
            s: PubShare::decode(dec)?,
            p: DleqProof::decode(dec)?,
        })
    }
}

impl Wire for SchnorrSignature {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_point(&self.r);
        enc.put_scalar(&self.s);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(SchnorrSignature {
            r: dec.point()?,
            s: dec.scalar()?,
        })
    }
}

impl Wire for ReencryptedShare {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_point(&self.k);
        enc.put_point_seq(&self.cs);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(ReencryptedShare {
            k: dec.point()?,
            cs: dec.point_seq()?,
        })
    }
}

impl Wire for WriteTxnData {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_point(&self.g);
        enc.put_point_seq(&self.sc_pub);
        enc.put_seq(&self.enc_shares);
        enc.put_point_seq(&self.enc_proofs);
        enc.put_fixed32(&self.hash_enc);
        enc.put_point(&self.reader_pk);
        enc.put_bytes(&self.readers);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(WriteTxnData {
            g: dec.point()?,
            sc_pub: dec.point_seq()?,
            enc_shares: dec.seq()?,
            enc_proofs: dec.point_seq()?,
            hash_enc: dec.fixed32()?,
            reader_pk: dec.point()?,
            readers: dec.bytes()?,
        })
    }
}

impl Wire for WriteTxn {
    fn encode(&self, enc: &mut Encoder) {
        self.data.encode(enc);
        enc.put_point(&self.writer);
        self.signature.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(WriteTxn {
            data: WriteTxnData::decode(dec)?,
            writer: dec.point()?,
            signature: SchnorrSignature::decode(dec)?,
        })
    }
}

impl Wire for ReadTxnData {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_fixed32(&self.data_id);
        enc.put_point(&self.reader_pk);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(ReadTxnData {
            data_id: dec.fixed32()?,
            reader_pk: dec.point()?,
        })
    }
}

impl Wire for ReadTxn {
    fn encode(&self, enc: &mut Encoder) {
        self.data.encode(enc);
        self.signature.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(ReadTxn {
            data: ReadTxnData::decode(dec)?,
            signature: SchnorrSignature::decode(dec)?,
        })
    }
}

const TAG_WRITE: u8 = 0;
const TAG_WRITE_TXN: u8 = 1;
const TAG_READ: u8 = 2;
const TAG_READERS: u8 = 3;

impl Wire for BlockData {
    fn encode(&self, enc: &mut Encoder) {
        match self {
            BlockData::Write(legacy) => {
                enc.put_u8(TAG_WRITE);
                enc.put_bytes(&legacy.data);
            }
            BlockData::WriteTxn(txn) => {
                enc.put_u8(TAG_WRITE_TXN);
                txn.encode(enc);
            }
            BlockData::Read(txn) => {
                enc.put_u8(TAG_READ);
                txn.encode(enc);
            }
            BlockData::Readers(readers) => {
                enc.put_u8(TAG_READERS);
                enc.put_point_seq(readers);
            }
        }
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        match dec.u8()? {
            TAG_WRITE => Ok(BlockData::Write(LegacyWrite { data: dec.bytes()? })),
            TAG_WRITE_TXN => Ok(BlockData::WriteTxn(WriteTxn::decode(dec)?)),
            TAG_READ => Ok(BlockData::Read(ReadTxn::decode(dec)?)),
            TAG_READERS => Ok(BlockData::Readers(dec.point_seq()?)),
            tag => Err(WireError::UnknownTag(tag)),
        }
    }
}

impl Wire for SkipBlockFix {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u64(self.index);
        enc.put_fixed32(&self.prev_hash);
        enc.put_bytes(&self.data);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(SkipBlockFix {
            index: dec.u64()?,
            prev_hash: dec.fixed32()?,
            data: dec.bytes()?,
        })
    }
}

impl Wire for ForwardLink {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_fixed32(&self.hash);
        self.signature.encode(enc);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(ForwardLink {
            hash: dec.fixed32()?,
            signature: SchnorrSignature::decode(dec)?,
        })
    }
}

impl Wire for DecryptRequest {
    fn encode(&self, enc: &mut Encoder) {
        self.write_block.encode(enc);
        self.read_block.encode(enc);
        self.inclusion_proof.encode(enc);
        enc.put_point_seq(&self.ac_pub);
    }

    fn decode(dec: &mut Decoder<'_>) -> Result<Self, WireError> {
        Ok(DecryptRequest {
            write_block: SkipBlockFix::decode(dec)?,
            read_block: SkipBlockFix::decode(dec)?,
            inclusion_proof: ForwardLink::decode(dec)?,
            ac_pub: dec.point_seq()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::schnorr;
    use crate::keys::Keypair;
    use crate::suite;
    use rand::thread_rng;

    fn sample_share() -> PubVerShare {
        let mut rng = thread_rng();
        let h = suite::hash_to_point(b"wire");
        let x = Scalar::random(&mut rng);
        let (p, _, xh) = DleqProof::new(&suite::BASE, &h, &x, &mut rng);
        PubVerShare {
            s: PubShare { i: 3, v: xh },
            p,
        }
    }

    #[test]
    fn pub_ver_share_roundtrip() {
        let share = sample_share();
        let decoded = PubVerShare::unmarshal(&share.marshal()).unwrap();
        assert_eq!(decoded, share);
    }

    #[test]
    fn block_data_roundtrip() {
        let mut rng = thread_rng();
        let reader = Keypair::generate(&mut rng);
        let txn = ReadTxn::new([9u8; 32], &reader, &mut rng);
        let data = BlockData::Read(txn);
        assert_eq!(BlockData::unmarshal(&data.marshal()).unwrap(), data);

        let readers = BlockData::Readers(vec![reader.pk, suite::BASE]);
        assert_eq!(BlockData::unmarshal(&readers.marshal()).unwrap(), readers);

        let legacy = BlockData::Write(LegacyWrite {
            data: vec![1, 2, 3],
        });
        assert_eq!(BlockData::unmarshal(&legacy.marshal()).unwrap(), legacy);
    }

    #[test]
    fn write_txn_roundtrip_preserves_reader_id_bytes() {
        let mut rng = thread_rng();
        let writer = Keypair::generate(&mut rng);
        let share = sample_share();
        let data = WriteTxnData {
            g: suite::BASE,
            sc_pub: vec![writer.pk],
            enc_shares: vec![share],
            enc_proofs: vec![suite::BASE],
            hash_enc: [7u8; 32],
            reader_pk: writer.pk,
            readers: vec![0xde, 0xad],
        };
        let txn = WriteTxn::new(data, &writer, &mut rng);
        let encoded = BlockData::WriteTxn(txn.clone()).marshal();
        match BlockData::unmarshal(&encoded).unwrap() {
            BlockData::WriteTxn(decoded) => {
                assert_eq!(decoded, txn);
                assert_eq!(decoded.data.readers, vec![0xde, 0xad]);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(
            BlockData::unmarshal(&[9u8]).unwrap_err(),
            WireError::UnknownTag(9)
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let share = sample_share();
        let mut bytes = share.marshal();
        bytes.push(0);
        assert_eq!(
            PubVerShare::unmarshal(&bytes).unwrap_err(),
            WireError::TrailingBytes(1)
        );
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        // A Readers payload declaring 2^31 points.
        let mut bytes = vec![3u8];
        bytes.extend_from_slice(&(1u32 << 31).to_le_bytes());
        assert!(matches!(
            BlockData::unmarshal(&bytes).unwrap_err(),
            WireError::Oversize { .. }
        ));
    }

    #[test]
    fn signature_encoding_is_64_bytes() {
        let mut rng = thread_rng();
        let kp = Keypair::generate(&mut rng);
        let sig = schnorr::sign(&kp.sk, b"len", &mut rng);
        assert_eq!(sig.marshal().len(), 64);
    }
}
