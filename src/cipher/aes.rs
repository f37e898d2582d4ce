use cipher::{BlockEncryptMut, BlockDecryptMut, InnerIvInit as _, KeyInit as _, StreamCipher as _};
use cipher::inout::InOutBuf;
use crate::Result;
use super::{CipherAlgo, Encrypt, Decrypt};

/// "aes128-ctr" cipher from RFC 4344.
pub static AES128_CTR: CipherAlgo = CipherAlgo {
    name: "aes128-ctr",
    block_len: 16,
    key_len: 16,
    iv_len: 16,
    make_encrypt: |key, iv| Box::new(Aes128Ctr::new(key, iv)),
    make_decrypt: |key, iv| Box::new(Aes128Ctr::new(key, iv)),
};

/// "aes256-ctr" cipher from RFC 4344.
pub static AES256_CTR: CipherAlgo = CipherAlgo {
    name: "aes256-ctr",
    block_len: 16,
    key_len: 32,
    iv_len: 16,
    make_encrypt: |key, iv| Box::new(Aes256Ctr::new(key, iv)),
    make_decrypt: |key, iv| Box::new(Aes256Ctr::new(key, iv)),
};

struct Aes128Ctr {
    cipher: ctr::Ctr128BE<aes::Aes128>,
}

impl Aes128Ctr {
    fn new(key: &[u8], iv: &[u8]) -> Self {
        let aes = aes::Aes128::new_from_slice(key).expect("invalid key length for aes128-ctr");
        let ctr = ctr::CtrCore::inner_iv_slice_init(aes, iv).expect("invalid iv length for aes128-ctr");
        let cipher = cipher::StreamCipherCoreWrapper::from_core(ctr);
        Self { cipher }
    }
}

impl Encrypt for Aes128Ctr {
    fn encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        Ok(self.cipher.apply_keystream(data))
    }
}

impl Decrypt for Aes128Ctr {
    fn decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        Ok(self.cipher.apply_keystream(data))
    }
}

struct Aes256Ctr {
    cipher: ctr::Ctr128BE<aes::Aes256>,
}

impl Aes256Ctr {
    fn new(key: &[u8], iv: &[u8]) -> Self {
        let aes = aes::Aes256::new_from_slice(key).expect("invalid key length for aes256-ctr");
        let ctr = ctr::CtrCore::inner_iv_slice_init(aes, iv).expect("invalid iv length for aes256-ctr");
        let cipher = cipher::StreamCipherCoreWrapper::from_core(ctr);
        Self { cipher }
    }
}

impl Encrypt for Aes256Ctr {
    fn encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        Ok(self.cipher.apply_keystream(data))
    }
}

impl Decrypt for Aes256Ctr {
    fn decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        Ok(self.cipher.apply_keystream(data))
    }
}

/// "aes256-cbc" cipher from RFC 4253, the traditional choice of `ssh-keygen` for key files.
pub static AES256_CBC: CipherAlgo = CipherAlgo {
    name: "aes256-cbc",
    block_len: 16,
    key_len: 32,
    iv_len: 16,
    make_encrypt: |key, iv| Box::new(Aes256CbcEnc::new(key, iv)),
    make_decrypt: |key, iv| Box::new(Aes256CbcDec::new(key, iv)),
};

struct Aes256CbcEnc {
    encrypt: cbc::Encryptor<aes::Aes256>,
}

struct Aes256CbcDec {
    decrypt: cbc::Decryptor<aes::Aes256>,
}

impl Aes256CbcEnc {
    fn new(key: &[u8], iv: &[u8]) -> Self {
        let aes = aes::Aes256::new_from_slice(key).expect("invalid key length for aes256-cbc");
        let encrypt = cbc::Encryptor::inner_iv_slice_init(aes, iv)
            .expect("invalid iv length for aes256-cbc");
        Self { encrypt }
    }
}

impl Aes256CbcDec {
    fn new(key: &[u8], iv: &[u8]) -> Self {
        let aes = aes::Aes256::new_from_slice(key).expect("invalid key length for aes256-cbc");
        let decrypt = cbc::Decryptor::inner_iv_slice_init(aes, iv)
            .expect("invalid iv length for aes256-cbc");
        Self { decrypt }
    }
}

impl Encrypt for Aes256CbcEnc {
    fn encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        let (blocks, tail) = InOutBuf::from(data).into_chunks();
        debug_assert!(tail.is_empty(), "plaintext is not aligned to block");
        Ok(self.encrypt.encrypt_blocks_inout_mut(blocks))
    }
}

impl Decrypt for Aes256CbcDec {
    fn decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        let (blocks, tail) = InOutBuf::from(data).into_chunks();
        debug_assert!(tail.is_empty(), "ciphertext is not aligned to block");
        Ok(self.decrypt.decrypt_blocks_inout_mut(blocks))
    }
}
