//! Argon2 memory-hard hashing with a per-pass hook
//!
//! A straight implementation of RFC 9106 (versions 0x10 and 0x13). It exists next to
//! the `argon2` crate because unlocking a database needs two things that crate does not
//! expose: a callback after every pass, so progress can be reported and cancellation
//! observed, and control over whether the working memory is wiped when a run is
//! abandoned. Parameter validation is still delegated to `argon2::Params`.
//!
//! Lanes are filled one after another on the calling thread.

use argon2::Params;
use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use zeroize::Zeroize;

const BLOCK_WORDS: usize = 128;
const BLOCK_BYTES: usize = BLOCK_WORDS * 8;
const SYNC_POINTS: u32 = 4;
const ADDRESSES_IN_BLOCK: u32 = 128;
const PREHASH_LEN: usize = 64;
const MIN_SALT_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Variant {
    Argon2d,
    // Not offered as a database KDF; kept for the RFC vectors.
    #[allow(dead_code)]
    Argon2i,
    Argon2id,
}

impl Variant {
    fn code(self) -> u32 {
        match self {
            Self::Argon2d => 0,
            Self::Argon2i => 1,
            Self::Argon2id => 2,
        }
    }
}

/// What the hook wants after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PassControl {
    Continue,
    /// Stop now. With `wipe_memory == false` the working memory is released without
    /// being overwritten first.
    Abort { wipe_memory: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HashOutcome {
    Completed,
    Aborted,
}

pub(crate) struct Input<'a> {
    pub password: &'a [u8],
    pub salt: &'a [u8],
    pub secret: &'a [u8],
    pub associated_data: &'a [u8],
}

#[derive(Clone, Copy, Zeroize)]
struct Block([u64; BLOCK_WORDS]);

impl Block {
    const ZERO: Self = Self([0; BLOCK_WORDS]);

    fn from_bytes(bytes: &[u8; BLOCK_BYTES]) -> Self {
        let mut block = Self::ZERO;
        for (word, chunk) in block.0.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut le = [0u8; 8];
            le.copy_from_slice(chunk);
            *word = u64::from_le_bytes(le);
        }
        block
    }

    fn to_bytes(&self) -> [u8; BLOCK_BYTES] {
        let mut bytes = [0u8; BLOCK_BYTES];
        for (chunk, word) in bytes.chunks_exact_mut(8).zip(self.0.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    fn xor_assign(&mut self, other: &Block) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a ^= b;
        }
    }
}

fn blamka(x: u64, y: u64) -> u64 {
    let lo = (x & 0xffff_ffff).wrapping_mul(y & 0xffff_ffff);
    x.wrapping_add(y).wrapping_add(lo.wrapping_mul(2))
}

fn gb(v: &mut [u64; BLOCK_WORDS], a: usize, b: usize, c: usize, d: usize) {
    v[a] = blamka(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = blamka(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = blamka(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = blamka(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

fn round(v: &mut [u64; BLOCK_WORDS], i: [usize; 16]) {
    gb(v, i[0], i[4], i[8], i[12]);
    gb(v, i[1], i[5], i[9], i[13]);
    gb(v, i[2], i[6], i[10], i[14]);
    gb(v, i[3], i[7], i[11], i[15]);
    gb(v, i[0], i[5], i[10], i[15]);
    gb(v, i[1], i[6], i[11], i[12]);
    gb(v, i[2], i[7], i[8], i[13]);
    gb(v, i[3], i[4], i[9], i[14]);
}

/// Compression function G(x, y)
fn compress(x: &Block, y: &Block) -> Block {
    let mut r = *x;
    r.xor_assign(y);
    let mut q = r;

    for row in 0..8 {
        let b = 16 * row;
        round(
            &mut q.0,
            [
                b,
                b + 1,
                b + 2,
                b + 3,
                b + 4,
                b + 5,
                b + 6,
                b + 7,
                b + 8,
                b + 9,
                b + 10,
                b + 11,
                b + 12,
                b + 13,
                b + 14,
                b + 15,
            ],
        );
    }
    for column in 0..8 {
        let b = 2 * column;
        round(
            &mut q.0,
            [
                b,
                b + 1,
                b + 16,
                b + 17,
                b + 32,
                b + 33,
                b + 48,
                b + 49,
                b + 64,
                b + 65,
                b + 80,
                b + 81,
                b + 96,
                b + 97,
                b + 112,
                b + 113,
            ],
        );
    }

    q.xor_assign(&r);
    q
}

fn blake2b(out: &mut [u8], parts: &[&[u8]]) -> Result<(), argon2::Error> {
    let mut hasher = Blake2bVar::new(out.len()).map_err(|_| argon2::Error::OutputTooLong)?;
    for part in parts {
        hasher.update(part);
    }
    hasher
        .finalize_variable(out)
        .map_err(|_| argon2::Error::OutputTooLong)
}

/// Variable-length hash H'
fn blake2b_long(out: &mut [u8], parts: &[&[u8]]) -> Result<(), argon2::Error> {
    let len = u32::try_from(out.len()).map_err(|_| argon2::Error::OutputTooLong)?;
    let prefix = len.to_le_bytes();
    let mut prefixed = Vec::with_capacity(parts.len() + 1);
    prefixed.push(&prefix[..]);
    prefixed.extend_from_slice(parts);

    if out.len() <= PREHASH_LEN {
        return blake2b(out, &prefixed);
    }

    let mut v = [0u8; PREHASH_LEN];
    blake2b(&mut v, &prefixed)?;
    out[..32].copy_from_slice(&v[..32]);

    let mut pos = 32;
    while out.len() - pos > PREHASH_LEN {
        let previous = v;
        blake2b(&mut v, &[&previous])?;
        out[pos..pos + 32].copy_from_slice(&v[..32]);
        pos += 32;
    }
    let previous = v;
    blake2b(&mut out[pos..], &[&previous])?;
    v.zeroize();
    Ok(())
}

struct Instance {
    variant: Variant,
    version: u32,
    passes: u32,
    lanes: u32,
    segment_length: u32,
    lane_length: u32,
    memory_blocks: u32,
}

impl Instance {
    fn data_independent(&self, pass: u32, slice: u32) -> bool {
        match self.variant {
            Variant::Argon2i => true,
            Variant::Argon2id => pass == 0 && slice < SYNC_POINTS / 2,
            Variant::Argon2d => false,
        }
    }

    fn reference_index(
        &self,
        pass: u32,
        slice: u32,
        index: u32,
        pseudo_rand: u64,
        same_lane: bool,
    ) -> u32 {
        let reference_area_size: u64 = if pass == 0 {
            if slice == 0 {
                u64::from(index) - 1
            } else if same_lane {
                u64::from(slice * self.segment_length + index) - 1
            } else if index == 0 {
                u64::from(slice * self.segment_length) - 1
            } else {
                u64::from(slice * self.segment_length)
            }
        } else {
            let base = u64::from(self.lane_length - self.segment_length);
            if same_lane {
                base + u64::from(index) - 1
            } else if index == 0 {
                base - 1
            } else {
                base
            }
        };

        let mut relative = pseudo_rand & 0xffff_ffff;
        relative = (relative * relative) >> 32;
        relative = reference_area_size - 1 - ((reference_area_size * relative) >> 32);

        let start = if pass != 0 && slice != SYNC_POINTS - 1 {
            u64::from((slice + 1) * self.segment_length)
        } else {
            0
        };

        ((start + relative) % u64::from(self.lane_length)) as u32
    }

    fn fill_segment(&self, memory: &mut [Block], pass: u32, lane: u32, slice: u32) {
        let data_independent = self.data_independent(pass, slice);
        let mut input_block = Block::ZERO;
        let mut address_block = Block::ZERO;

        if data_independent {
            input_block.0[0] = u64::from(pass);
            input_block.0[1] = u64::from(lane);
            input_block.0[2] = u64::from(slice);
            input_block.0[3] = u64::from(self.memory_blocks);
            input_block.0[4] = u64::from(self.passes);
            input_block.0[5] = u64::from(self.variant.code());
        }

        let mut starting_index = 0;
        if pass == 0 && slice == 0 {
            // The first two blocks of each lane come from the initial hash.
            starting_index = 2;
            if data_independent {
                next_addresses(&mut input_block, &mut address_block);
            }
        }

        let lane_length = self.lane_length as usize;
        let mut current = lane as usize * lane_length
            + (slice * self.segment_length + starting_index) as usize;
        let mut previous = if current % lane_length == 0 {
            current + lane_length - 1
        } else {
            current - 1
        };

        for index in starting_index..self.segment_length {
            if current % lane_length == 1 {
                previous = current - 1;
            }

            let pseudo_rand = if data_independent {
                if index % ADDRESSES_IN_BLOCK == 0 {
                    next_addresses(&mut input_block, &mut address_block);
                }
                address_block.0[(index % ADDRESSES_IN_BLOCK) as usize]
            } else {
                memory[previous].0[0]
            };

            let reference_lane = if pass == 0 && slice == 0 {
                lane
            } else {
                ((pseudo_rand >> 32) % u64::from(self.lanes)) as u32
            };
            let reference = self.reference_index(
                pass,
                slice,
                index,
                pseudo_rand,
                reference_lane == lane,
            );
            let reference = reference_lane as usize * lane_length + reference as usize;

            let block = compress(&memory[previous], &memory[reference]);
            if self.version == 0x10 || pass == 0 {
                memory[current] = block;
            } else {
                memory[current].xor_assign(&block);
            }

            current += 1;
            previous += 1;
        }
    }
}

/// Advance the address counter and derive the next block of reference indices.
fn next_addresses(input: &mut Block, address: &mut Block) {
    input.0[6] += 1;
    let first = compress(&Block::ZERO, input);
    *address = compress(&Block::ZERO, &first);
}

fn wipe(memory: &mut [Block]) {
    for block in memory.iter_mut() {
        block.zeroize();
    }
}

/// Hash `input` into `out`.
///
/// `on_pass` is called with the number of completed passes after each pass and decides
/// whether to go on. On an abort `out` is left untouched.
pub(crate) fn hash(
    variant: Variant,
    version: u32,
    params: &Params,
    input: &Input<'_>,
    out: &mut [u8],
    on_pass: impl FnMut(u32) -> PassControl,
) -> Result<HashOutcome, argon2::Error> {
    let mut memory = Vec::new();
    hash_in(variant, version, params, input, out, &mut memory, on_pass)
}

/// [`hash`] over a caller-owned block buffer, which is resized to fit.
///
/// The buffer is zeroed on completion and on an abort that asks for a wipe; otherwise
/// it keeps the filled blocks until the caller drops it.
fn hash_in(
    variant: Variant,
    version: u32,
    params: &Params,
    input: &Input<'_>,
    out: &mut [u8],
    memory: &mut Vec<Block>,
    mut on_pass: impl FnMut(u32) -> PassControl,
) -> Result<HashOutcome, argon2::Error> {
    argon2::Version::try_from(version)?;
    if input.salt.len() < MIN_SALT_LEN {
        return Err(argon2::Error::SaltTooShort);
    }
    let salt_len = u32::try_from(input.salt.len()).map_err(|_| argon2::Error::SaltTooLong)?;
    let password_len =
        u32::try_from(input.password.len()).map_err(|_| argon2::Error::PwdTooLong)?;
    let secret_len =
        u32::try_from(input.secret.len()).map_err(|_| argon2::Error::SecretTooLong)?;
    let ad_len =
        u32::try_from(input.associated_data.len()).map_err(|_| argon2::Error::AdTooLong)?;
    let out_len = u32::try_from(out.len()).map_err(|_| argon2::Error::OutputTooLong)?;
    if out_len < 4 {
        return Err(argon2::Error::OutputTooShort);
    }

    let lanes = params.p_cost();
    let passes = params.t_cost();
    let segment_length = params.m_cost().max(2 * SYNC_POINTS * lanes) / (lanes * SYNC_POINTS);
    let instance = Instance {
        variant,
        version,
        passes,
        lanes,
        segment_length,
        lane_length: segment_length * SYNC_POINTS,
        memory_blocks: segment_length * SYNC_POINTS * lanes,
    };

    wipe(memory);
    memory.clear();
    memory
        .try_reserve_exact(instance.memory_blocks as usize)
        .map_err(|_| argon2::Error::MemoryTooMuch)?;
    memory.resize(instance.memory_blocks as usize, Block::ZERO);

    let mut prehash = [0u8; PREHASH_LEN];
    blake2b(
        &mut prehash,
        &[
            &lanes.to_le_bytes(),
            &out_len.to_le_bytes(),
            &params.m_cost().to_le_bytes(),
            &passes.to_le_bytes(),
            &version.to_le_bytes(),
            &variant.code().to_le_bytes(),
            &password_len.to_le_bytes(),
            input.password,
            &salt_len.to_le_bytes(),
            input.salt,
            &secret_len.to_le_bytes(),
            input.secret,
            &ad_len.to_le_bytes(),
            input.associated_data,
        ],
    )?;

    let mut seed = [0u8; BLOCK_BYTES];
    for lane in 0..lanes {
        let offset = (lane * instance.lane_length) as usize;
        for column in 0..2u32 {
            blake2b_long(
                &mut seed,
                &[&prehash, &column.to_le_bytes(), &lane.to_le_bytes()],
            )?;
            memory[offset + column as usize] = Block::from_bytes(&seed);
        }
    }
    seed.zeroize();
    prehash.zeroize();

    for pass in 0..passes {
        for slice in 0..SYNC_POINTS {
            for lane in 0..lanes {
                instance.fill_segment(memory, pass, lane, slice);
            }
        }
        if let PassControl::Abort { wipe_memory } = on_pass(pass + 1) {
            if wipe_memory {
                wipe(memory);
            }
            return Ok(HashOutcome::Aborted);
        }
    }

    let last_column = (instance.lane_length - 1) as usize;
    let mut final_block = memory[last_column];
    for lane in 1..lanes as usize {
        final_block.xor_assign(&memory[lane * instance.lane_length as usize + last_column]);
    }
    let mut final_bytes = final_block.to_bytes();
    blake2b_long(out, &[&final_bytes])?;

    final_bytes.zeroize();
    final_block.zeroize();
    wipe(memory);
    Ok(HashOutcome::Completed)
}
