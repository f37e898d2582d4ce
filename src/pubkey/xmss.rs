//! XMSS stateful hash-based signatures (RFC 8391), as used by "ssh-xmss@openssh.com".
//!
//! XMSS is a one-time-signature scheme lifted to many uses with a Merkle tree: each signature
//! consumes one leaf of the tree and the private key must remember which leaves were spent.
//! Signing therefore mutates the key, and reusing a leaf index destroys security. See
//! [`XmssPrivkey::sign_committed()`] for a way to tie signing to durable persistence of the
//! updated state.
use bytes::Bytes;
use rand::{CryptoRng, RngCore};
use sha2::Digest as _;
use std::fmt;
use zeroize::{Zeroize as _, Zeroizing};
use crate::codec::{PacketDecode, PacketEncode};
use crate::error::{Result, Error};
use super::{PubkeyAlgo, Pubkey, Privkey, SignatureVerified};

/// "ssh-xmss@openssh.com" public key algorithm.
///
/// This algorithm is compatible with [`XmssPubkey`] and [`XmssPrivkey`].
pub static SSH_XMSS: PubkeyAlgo = PubkeyAlgo {
    name: "ssh-xmss@openssh.com",
    verify,
    sign,
};

/// XMSS parameter set.
///
/// All sets use SHA-256 with 32-byte hashes and Winternitz parameter 16; they differ in the tree
/// height, which bounds the number of signatures the key can ever make.
#[derive(Debug, PartialEq, Eq)]
pub struct XmssParams {
    /// Name of the parameter set, as it appears in encoded keys.
    pub name: &'static str,
    /// Height of the Merkle tree; the key can sign `2^height` messages.
    pub height: u32,
}

/// XMSS-SHA2_10_256: tree of height 10, good for 1024 signatures. The default.
pub static XMSS_SHA2_10_256: XmssParams = XmssParams { name: "XMSS_SHA2_10_256", height: 10 };
/// XMSS-SHA2_16_256: tree of height 16, good for 65536 signatures.
pub static XMSS_SHA2_16_256: XmssParams = XmssParams { name: "XMSS_SHA2_16_256", height: 16 };
/// XMSS-SHA2_20_256: tree of height 20, good for about a million signatures.
pub static XMSS_SHA2_20_256: XmssParams = XmssParams { name: "XMSS_SHA2_20_256", height: 20 };

static PARAM_SETS: &[&XmssParams] = &[&XMSS_SHA2_10_256, &XMSS_SHA2_16_256, &XMSS_SHA2_20_256];

const N: usize = 32;
// Winternitz chains per signature: 64 message nibbles plus a 3-nibble checksum
const WOTS_LEN1: usize = 64;
const WOTS_LEN2: usize = 3;
const WOTS_LEN: usize = WOTS_LEN1 + WOTS_LEN2;
const WOTS_W: u32 = 16;

/// XMSS public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmssPubkey {
    pub(crate) params: &'static XmssParams,
    pub(crate) root: [u8; N],
    pub(crate) pub_seed: [u8; N],
}

/// XMSS private key, including the one-time-signature state.
///
/// The key remembers the index of the next unused leaf. [`Privkey::sign()`][super::Privkey::sign]
/// advances the index exactly once per call and fails once all leaves are spent.
#[derive(Clone)]
#[cfg_attr(feature = "debug_less_secure", derive(Debug))]
pub struct XmssPrivkey {
    pub(crate) pubkey: XmssPubkey,
    pub(crate) idx: u32,
    pub(crate) sk_seed: [u8; N],
    pub(crate) sk_prf: [u8; N],
    // all tree nodes, cached to make signing cheap: tree[level][i], level 0 holds the leaves
    tree: Vec<Vec<[u8; N]>>,
}

impl XmssPubkey {
    /// The parameter set of this key.
    pub fn params(&self) -> &'static XmssParams { self.params }
}

impl XmssPrivkey {
    /// Get the public key associated with this private key.
    pub fn pubkey(&self) -> XmssPubkey {
        self.pubkey.clone()
    }

    /// The parameter set of this key.
    pub fn params(&self) -> &'static XmssParams {
        self.pubkey.params
    }

    /// Number of signatures this key can still make.
    pub fn signatures_remaining(&self) -> u64 {
        (1u64 << self.pubkey.params.height) - self.idx as u64
    }

    /// Sign `message`, releasing the signature only after the updated key state is persisted.
    ///
    /// The leaf index is advanced first and `persist` is called with the updated key. If
    /// `persist` fails, the signature is zeroed and discarded instead of returned: handing it out
    /// without durably recording that its leaf was spent would risk a fatal index reuse after a
    /// crash. The index stays advanced in memory either way.
    pub fn sign_committed<E>(
        &mut self,
        message: &[u8],
        persist: impl FnOnce(&XmssPrivkey) -> std::result::Result<(), E>,
    ) -> Result<Bytes> {
        let mut signature = self.sign_raw(message)?;
        if persist(self).is_err() {
            signature.zeroize();
            return Err(Error::Crypto("xmss state was not persisted, discarding the signature"))
        }
        Ok(encode_signature(&signature))
    }

    fn sign_raw(&mut self, message: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let params = self.pubkey.params;
        if (self.idx as u64) >= 1u64 << params.height {
            return Err(Error::Crypto("xmss key is exhausted, all one-time leaves are spent"))
        }
        let idx = self.idx;
        self.idx += 1;

        let r = prf(&self.sk_prf, &to_bytes(idx as u64));
        let digest = h_msg(&r, &self.pubkey.root, idx, message);

        let mut signature = Zeroizing::new(Vec::with_capacity(4 + N + WOTS_LEN * N
            + params.height as usize * N));
        signature.extend_from_slice(&idx.to_be_bytes());
        signature.extend_from_slice(&r);

        let mut adrs = Adrs::default();
        adrs.set_type(ADRS_OTS);
        adrs.set_ots(idx);
        let ots_sig = wots_sign(&digest, &self.sk_seed, &self.pubkey.pub_seed, adrs);
        for chain in ots_sig.iter() {
            signature.extend_from_slice(chain);
        }

        for level in 0..params.height as usize {
            let sibling = (idx as usize >> level) ^ 1;
            signature.extend_from_slice(&self.tree[level][sibling]);
        }
        Ok(signature)
    }
}

impl Drop for XmssPrivkey {
    fn drop(&mut self) {
        self.sk_seed.zeroize();
        self.sk_prf.zeroize();
    }
}

impl PartialEq for XmssPrivkey {
    fn eq(&self, other: &Self) -> bool {
        self.pubkey == other.pubkey && self.idx == other.idx
            && self.sk_seed == other.sk_seed && self.sk_prf == other.sk_prf
    }
}
impl Eq for XmssPrivkey {}

fn verify(pubkey: &Pubkey, message: &[u8], signature: Bytes) -> Result<SignatureVerified> {
    let Pubkey::Xmss(pubkey) = pubkey else { return Err(Error::PubkeyFormat) };
    let params = pubkey.params;

    let mut signature = PacketDecode::new(signature);
    if signature.get_string()? != "ssh-xmss@openssh.com" {
        return Err(Error::Decode("unexpected signature format"))
    }
    let signature_data = signature.get_bytes()?;
    let expected_len = 4 + N + WOTS_LEN * N + params.height as usize * N;
    if signature_data.len() != expected_len {
        return Err(Error::Decode("unexpected length of xmss signature"))
    }

    let idx = u32::from_be_bytes(signature_data[..4].try_into().unwrap());
    if (idx as u64) >= 1u64 << params.height {
        return Err(Error::Signature)
    }
    let mut r = [0; N];
    r.copy_from_slice(&signature_data[4..4 + N]);

    let mut ots_sig = [[0u8; N]; WOTS_LEN];
    for (i, chain) in ots_sig.iter_mut().enumerate() {
        let at = 4 + N + i * N;
        chain.copy_from_slice(&signature_data[at..at + N]);
    }

    let digest = h_msg(&r, &pubkey.root, idx, message);

    let mut adrs = Adrs::default();
    adrs.set_type(ADRS_OTS);
    adrs.set_ots(idx);
    let wots_pk = wots_pk_from_sig(&digest, &ots_sig, &pubkey.pub_seed, adrs);

    let mut adrs = Adrs::default();
    adrs.set_type(ADRS_LTREE);
    adrs.set_ltree(idx);
    let mut node = ltree(&wots_pk, &pubkey.pub_seed, adrs);

    let mut adrs = Adrs::default();
    adrs.set_type(ADRS_TREE);
    let auth_at = 4 + N + WOTS_LEN * N;
    let mut tree_idx = idx;
    for level in 0..params.height {
        let at = auth_at + level as usize * N;
        let mut sibling = [0; N];
        sibling.copy_from_slice(&signature_data[at..at + N]);

        adrs.set_tree_height(level);
        adrs.set_tree_index(tree_idx >> 1);
        node = if tree_idx & 1 == 0 {
            rand_hash(&node, &sibling, &pubkey.pub_seed, &mut adrs)
        } else {
            rand_hash(&sibling, &node, &pubkey.pub_seed, &mut adrs)
        };
        tree_idx >>= 1;
    }

    if node == pubkey.root {
        Ok(SignatureVerified::assertion())
    } else {
        Err(Error::Signature)
    }
}

fn sign(privkey: &mut Privkey, message: &[u8]) -> Result<Bytes> {
    let Privkey::Xmss(privkey) = privkey else { return Err(Error::PrivkeyFormat) };
    let signature = privkey.sign_raw(message)?;
    Ok(encode_signature(&signature))
}

fn encode_signature(signature_data: &[u8]) -> Bytes {
    let mut signature = PacketEncode::new();
    signature.put_str("ssh-xmss@openssh.com");
    signature.put_bytes(signature_data);
    signature.finish()
}

pub(super) fn generate(rng: &mut (impl CryptoRng + RngCore), params: &'static XmssParams) -> XmssPrivkey {
    let mut sk_seed = [0; N];
    let mut sk_prf = [0; N];
    let mut pub_seed = [0; N];
    rng.fill_bytes(&mut sk_seed);
    rng.fill_bytes(&mut sk_prf);
    rng.fill_bytes(&mut pub_seed);

    let tree = build_tree(params, &sk_seed, &pub_seed);
    let root = tree[params.height as usize][0];
    XmssPrivkey {
        pubkey: XmssPubkey { params, root, pub_seed },
        idx: 0, sk_seed, sk_prf, tree,
    }
}

pub(super) fn decode_pubkey_parts(blob: &mut PacketDecode) -> Result<XmssPubkey> {
    let name = blob.get_string()?;
    let params = params_by_name(&name)?;
    let pk = blob.get_bytes()?;
    if pk.len() != 2 * N {
        return Err(Error::Decode("unexpected length of xmss public key"))
    }
    let mut root = [0; N];
    let mut pub_seed = [0; N];
    root.copy_from_slice(&pk[..N]);
    pub_seed.copy_from_slice(&pk[N..]);
    Ok(XmssPubkey { params, root, pub_seed })
}

pub(super) fn encode_pubkey_parts(blob: &mut PacketEncode, pubkey: &XmssPubkey) {
    blob.put_str(pubkey.params.name);
    let mut pk = Vec::with_capacity(2 * N);
    pk.extend_from_slice(&pubkey.root);
    pk.extend_from_slice(&pubkey.pub_seed);
    blob.put_bytes(&pk);
}

pub(super) fn decode_privkey_parts(blob: &mut PacketDecode) -> Result<XmssPrivkey> {
    let name = blob.get_string()?;
    let params = params_by_name(&name)?;
    let pk = blob.get_bytes()?;
    if pk.len() != 2 * N {
        return Err(Error::Decode("unexpected length of xmss public key"))
    }
    let sk = Zeroizing::new(blob.get_bytes()?.to_vec());
    if sk.len() != 4 + 4 * N {
        return Err(Error::Decode("unexpected length of xmss private key"))
    }

    let idx = u32::from_be_bytes(sk[..4].try_into().unwrap());
    let mut sk_seed = [0; N];
    let mut sk_prf = [0; N];
    let mut pub_seed = [0; N];
    let mut root = [0; N];
    sk_seed.copy_from_slice(&sk[4..4 + N]);
    sk_prf.copy_from_slice(&sk[4 + N..4 + 2 * N]);
    pub_seed.copy_from_slice(&sk[4 + 2 * N..4 + 3 * N]);
    root.copy_from_slice(&sk[4 + 3 * N..]);

    if pk[..N] != root || pk[N..] != pub_seed {
        return Err(Error::Decode("xmss privkey does not match pubkey"))
    }
    if (idx as u64) > 1u64 << params.height {
        return Err(Error::Decode("xmss leaf index is out of range"))
    }

    // the node cache is not serialized, rebuild it and cross-check the root
    let tree = build_tree(params, &sk_seed, &pub_seed);
    if tree[params.height as usize][0] != root {
        return Err(Error::Decode("xmss private seed does not produce the public root"))
    }

    Ok(XmssPrivkey {
        pubkey: XmssPubkey { params, root, pub_seed },
        idx, sk_seed, sk_prf, tree,
    })
}

pub(super) fn encode_privkey_parts(blob: &mut PacketEncode, privkey: &XmssPrivkey) {
    encode_pubkey_parts(blob, &privkey.pubkey);
    let mut sk = Zeroizing::new(Vec::with_capacity(4 + 4 * N));
    sk.extend_from_slice(&privkey.idx.to_be_bytes());
    sk.extend_from_slice(&privkey.sk_seed);
    sk.extend_from_slice(&privkey.sk_prf);
    sk.extend_from_slice(&privkey.pubkey.pub_seed);
    sk.extend_from_slice(&privkey.pubkey.root);
    blob.put_bytes(&sk);
}

fn params_by_name(name: &str) -> Result<&'static XmssParams> {
    PARAM_SETS.iter().copied().find(|params| params.name == name)
        .ok_or(Error::Decode("unknown xmss parameter set"))
}



// Hash addressing scheme from RFC 8391, eight big-endian words.
const ADRS_OTS: u32 = 0;
const ADRS_LTREE: u32 = 1;
const ADRS_TREE: u32 = 2;

#[derive(Debug, Clone, Copy, Default)]
struct Adrs([u32; 8]);

impl Adrs {
    fn set_type(&mut self, type_: u32) {
        self.0[3] = type_;
        for word in &mut self.0[4..] { *word = 0; }
    }
    fn set_ots(&mut self, value: u32) { self.0[4] = value; }
    fn set_ltree(&mut self, value: u32) { self.0[4] = value; }
    fn set_chain(&mut self, value: u32) { self.0[5] = value; }
    fn set_tree_height(&mut self, value: u32) { self.0[5] = value; }
    fn set_hash(&mut self, value: u32) { self.0[6] = value; }
    fn set_tree_index(&mut self, value: u32) { self.0[6] = value; }
    fn set_key_and_mask(&mut self, value: u32) { self.0[7] = value; }

    fn bytes(&self) -> [u8; 32] {
        let mut bytes = [0; 32];
        for (i, word) in self.0.iter().enumerate() {
            bytes[4 * i..4 * i + 4].copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }
}

// Domain separated hashes: SHA-256 over a 32-byte tag, then the key, then the input.
fn keyed_hash(tag: u8, key: &[u8], input: &[u8]) -> [u8; N] {
    let mut hasher = sha2::Sha256::new();
    hasher.update(to_bytes(tag as u64));
    hasher.update(key);
    hasher.update(input);
    hasher.finalize().into()
}

fn to_bytes(value: u64) -> [u8; N] {
    let mut bytes = [0; N];
    bytes[N - 8..].copy_from_slice(&value.to_be_bytes());
    bytes
}

fn hash_f(key: &[u8; N], input: &[u8; N]) -> [u8; N] { keyed_hash(0, key, input) }

fn prf(key: &[u8; N], input: &[u8; 32]) -> [u8; N] { keyed_hash(3, key, input) }

fn h_msg(r: &[u8; N], root: &[u8; N], idx: u32, message: &[u8]) -> [u8; N] {
    let mut key = Vec::with_capacity(3 * N);
    key.extend_from_slice(r);
    key.extend_from_slice(root);
    key.extend_from_slice(&to_bytes(idx as u64));
    keyed_hash(2, &key, message)
}

// Hash two child nodes into their parent, with a key and bitmasks derived from the address.
fn rand_hash(left: &[u8; N], right: &[u8; N], pub_seed: &[u8; N], adrs: &mut Adrs) -> [u8; N] {
    adrs.set_key_and_mask(0);
    let key = prf(pub_seed, &adrs.bytes());
    adrs.set_key_and_mask(1);
    let mask_left = prf(pub_seed, &adrs.bytes());
    adrs.set_key_and_mask(2);
    let mask_right = prf(pub_seed, &adrs.bytes());

    let mut input = [0; 2 * N];
    for i in 0..N {
        input[i] = left[i] ^ mask_left[i];
        input[N + i] = right[i] ^ mask_right[i];
    }
    keyed_hash(1, &key, &input)
}



// WOTS+ one-time signatures (RFC 8391 section 3).

fn wots_chain(start_value: &[u8; N], start: u32, steps: u32, pub_seed: &[u8; N], adrs: &mut Adrs)
    -> [u8; N]
{
    let mut value = *start_value;
    for i in start..start + steps {
        adrs.set_hash(i);
        adrs.set_key_and_mask(0);
        let key = prf(pub_seed, &adrs.bytes());
        adrs.set_key_and_mask(1);
        let mask = prf(pub_seed, &adrs.bytes());
        for j in 0..N {
            value[j] ^= mask[j];
        }
        value = hash_f(&key, &value);
    }
    value
}

// Per-leaf WOTS secret chains, derived from the private seed and the leaf address.
fn wots_expand_seed(sk_seed: &[u8; N], mut adrs: Adrs) -> Zeroizing<Vec<[u8; N]>> {
    adrs.set_chain(0);
    adrs.set_hash(0);
    adrs.set_key_and_mask(0);
    let ots_seed = Zeroizing::new(prf(sk_seed, &adrs.bytes()));

    let mut chains = Zeroizing::new(Vec::with_capacity(WOTS_LEN));
    for i in 0..WOTS_LEN {
        chains.push(prf(&ots_seed, &to_bytes(i as u64)));
    }
    chains
}

// Message digest as 67 base-16 digits: 64 from the hash, 3 from its checksum.
fn wots_digits(digest: &[u8; N]) -> [u8; WOTS_LEN] {
    let mut digits = [0; WOTS_LEN];
    for (i, byte) in digest.iter().enumerate() {
        digits[2 * i] = byte >> 4;
        digits[2 * i + 1] = byte & 0x0f;
    }

    let mut checksum: u32 = digits[..WOTS_LEN1].iter()
        .map(|&digit| WOTS_W - 1 - digit as u32)
        .sum();
    // the 12-bit checksum is left aligned in two bytes before being split to digits
    checksum <<= 4;
    digits[WOTS_LEN1] = (checksum >> 12) as u8 & 0x0f;
    digits[WOTS_LEN1 + 1] = (checksum >> 8) as u8 & 0x0f;
    digits[WOTS_LEN1 + 2] = (checksum >> 4) as u8 & 0x0f;
    digits
}

fn wots_sign(digest: &[u8; N], sk_seed: &[u8; N], pub_seed: &[u8; N], mut adrs: Adrs)
    -> Vec<[u8; N]>
{
    let chains = wots_expand_seed(sk_seed, adrs);
    let digits = wots_digits(digest);
    let mut signature = Vec::with_capacity(WOTS_LEN);
    for i in 0..WOTS_LEN {
        adrs.set_chain(i as u32);
        signature.push(wots_chain(&chains[i], 0, digits[i] as u32, pub_seed, &mut adrs));
    }
    signature
}

fn wots_pk_from_sig(digest: &[u8; N], signature: &[[u8; N]; WOTS_LEN], pub_seed: &[u8; N],
    mut adrs: Adrs) -> Vec<[u8; N]>
{
    let digits = wots_digits(digest);
    let mut pk = Vec::with_capacity(WOTS_LEN);
    for i in 0..WOTS_LEN {
        adrs.set_chain(i as u32);
        let start = digits[i] as u32;
        pk.push(wots_chain(&signature[i], start, WOTS_W - 1 - start, pub_seed, &mut adrs));
    }
    pk
}

fn wots_pk(sk_seed: &[u8; N], pub_seed: &[u8; N], mut adrs: Adrs) -> Vec<[u8; N]> {
    let chains = wots_expand_seed(sk_seed, adrs);
    let mut pk = Vec::with_capacity(WOTS_LEN);
    for i in 0..WOTS_LEN {
        adrs.set_chain(i as u32);
        pk.push(wots_chain(&chains[i], 0, WOTS_W - 1, pub_seed, &mut adrs));
    }
    pk
}

// Compress a 67-chain WOTS public key into a single leaf node.
fn ltree(wots_pk: &[[u8; N]], pub_seed: &[u8; N], mut adrs: Adrs) -> [u8; N] {
    let mut nodes = wots_pk.to_vec();
    let mut height = 0;
    while nodes.len() > 1 {
        adrs.set_tree_height(height);
        let mut parents = Vec::with_capacity((nodes.len() + 1) / 2);
        for (i, pair) in nodes.chunks(2).enumerate() {
            if pair.len() == 2 {
                adrs.set_tree_index(i as u32);
                parents.push(rand_hash(&pair[0], &pair[1], pub_seed, &mut adrs));
            } else {
                parents.push(pair[0]);
            }
        }
        nodes = parents;
        height += 1;
    }
    nodes[0]
}

fn build_tree(params: &XmssParams, sk_seed: &[u8; N], pub_seed: &[u8; N]) -> Vec<Vec<[u8; N]>> {
    let leaf_count = 1usize << params.height;
    let mut leaves = Vec::with_capacity(leaf_count);
    for i in 0..leaf_count {
        let mut ots_adrs = Adrs::default();
        ots_adrs.set_type(ADRS_OTS);
        ots_adrs.set_ots(i as u32);
        let pk = wots_pk(sk_seed, pub_seed, ots_adrs);

        let mut ltree_adrs = Adrs::default();
        ltree_adrs.set_type(ADRS_LTREE);
        ltree_adrs.set_ltree(i as u32);
        leaves.push(ltree(&pk, pub_seed, ltree_adrs));
    }

    let mut tree = vec![leaves];
    let mut adrs = Adrs::default();
    adrs.set_type(ADRS_TREE);
    for level in 0..params.height {
        adrs.set_tree_height(level);
        let below = &tree[level as usize];
        let mut above = Vec::with_capacity(below.len() / 2);
        for i in 0..below.len() / 2 {
            adrs.set_tree_index(i as u32);
            above.push(rand_hash(&below[2 * i], &below[2 * i + 1], pub_seed, &mut adrs));
        }
        tree.push(above);
    }
    tree
}

impl fmt::Display for XmssPubkey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let root = Bytes::copy_from_slice(&self.root);
        write!(f, "xmss {} root {:x}", self.params.name, root)
    }
}
