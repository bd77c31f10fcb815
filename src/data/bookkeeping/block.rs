// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use std::collections::HashSet;
use std::fmt;
use std::time::SystemTime;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::InvalidBlock;
use crate::crypto::{self, hashable::*, merkle};
use crate::data::basics::{BlockHeight, Currency, Timestamp, UnlockHash};
use crate::data::transactions::{
    CoinOutput, CoinOutputID, OutputSet, Transaction, TransactionRegistry, ValidationContext,
};
use crate::data::unlock::Condition;
use crate::protocol::{Codec, CodecError, Decodable, Decoder, Encodable, Encoder};

/// Hash of a block header.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockID(pub CryptoHash);

impl fmt::Display for BlockID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locates the block stake output a block creator proves ownership of.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStakeOutputIndexes {
    #[serde(rename = "blockheight")]
    pub block_height: BlockHeight,
    #[serde(rename = "transactionindex")]
    pub transaction_index: u64,
    #[serde(rename = "outputindex")]
    pub output_index: u64,
}

/// Pays the block creator, as a coin output created by the block itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerPayout {
    pub value: Currency,
    #[serde(rename = "unlockhash")]
    pub unlock_hash: UnlockHash,
}

/// The fixed-size summary of a block that its ID is computed over.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    #[serde(rename = "parentid")]
    pub parent_id: BlockID,
    #[serde(rename = "pobsoutput")]
    pub pobs_output: BlockStakeOutputIndexes,
    pub timestamp: Timestamp,
    /// Root of the Merkle tree over the miner payouts, followed by the transactions.
    #[serde(rename = "merkleroot")]
    pub merkle_root: CryptoHash,
}

/// A block groups transactions and the payouts of its creator.
///
/// Transactions can only be encoded through the `TransactionRegistry`
/// that knows their versions, so everything deriving from their bytes takes one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub parent_id: BlockID,
    pub timestamp: Timestamp,
    pub pobs_output: BlockStakeOutputIndexes,
    pub miner_payouts: Vec<MinerPayout>,
    pub transactions: Vec<Transaction>,
}

impl BlockHeader {
    pub fn id(&self) -> BlockID {
        BlockID(hash_obj(self))
    }

    /// Checks that this header is a valid successor of `prev`.
    pub fn pre_check(&self, prev: &BlockHeader) -> Result<(), InvalidBlock> {
        let prev_id = prev.id();
        if self.parent_id != prev_id {
            return Err(InvalidBlock::WrongParent(self.parent_id, prev_id));
        }
        if self.timestamp < prev.timestamp {
            return Err(InvalidBlock::BadEarlyTimestamp(self.timestamp, prev.timestamp));
        }
        Ok(())
    }
}

impl Block {
    /// Constructs an empty block on top of `prev`, timestamped now.
    /// The timestamp never goes back before the one of `prev`.
    pub fn new(prev: &BlockHeader, pobs_output: BlockStakeOutputIndexes) -> Block {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_else(|err| {
                warn!("Block::new(): system clock before unix epoch: {:?}", err);
                0
            });

        Block {
            parent_id: prev.id(),
            timestamp: Timestamp(now.max(prev.timestamp.0)),
            pobs_output,
            ..Default::default()
        }
    }

    /// Root of the Merkle tree whose leaves are the classic encodings of
    /// all miner payouts, followed by those of all transactions.
    pub fn merkle_root(&self, registry: &TransactionRegistry) -> Result<CryptoHash, InvalidBlock> {
        let mut leaves: Vec<Vec<u8>> = self
            .miner_payouts
            .iter()
            .map(crate::protocol::encode_classic)
            .collect();
        for tx in &self.transactions {
            leaves.push(registry.encode(Codec::Classic, tx)?);
        }
        Ok(merkle::Tree::from_leaves(&leaves).root())
    }

    pub fn header(&self, registry: &TransactionRegistry) -> Result<BlockHeader, InvalidBlock> {
        Ok(BlockHeader {
            parent_id: self.parent_id,
            pobs_output: self.pobs_output,
            timestamp: self.timestamp,
            merkle_root: self.merkle_root(registry)?,
        })
    }

    pub fn id(&self, registry: &TransactionRegistry) -> Result<BlockID, InvalidBlock> {
        Ok(self.header(registry)?.id())
    }

    /// ID of the coin output created by the miner payout at `index`.
    pub fn miner_payout_id(
        &self,
        registry: &TransactionRegistry,
        index: u64,
    ) -> Result<CoinOutputID, InvalidBlock> {
        let id = self.id(registry)?;
        Ok(CoinOutputID(crypto::hash_all(&[&id, &index])))
    }

    /// Encodes the block; each transaction is length-prefixed,
    /// so transactions of unknown versions can be skipped over.
    pub fn encode(
        &self,
        registry: &TransactionRegistry,
        codec: Codec,
    ) -> Result<Vec<u8>, InvalidBlock> {
        let mut e = Encoder::new(codec);
        e.write(&self.parent_id);
        e.write(&self.timestamp);
        e.write(&self.pobs_output);
        e.write(&self.miner_payouts);
        e.write_len(self.transactions.len());
        for tx in &self.transactions {
            e.write_bytes(&registry.encode(codec, tx)?);
        }
        Ok(e.finish()?)
    }

    pub fn decode(
        registry: &TransactionRegistry,
        codec: Codec,
        bytes: &[u8],
    ) -> Result<Block, InvalidBlock> {
        let mut d = Decoder::new(codec, bytes);
        let mut block = Block {
            parent_id: d.read()?,
            timestamp: d.read()?,
            pobs_output: d.read()?,
            miner_payouts: d.read()?,
            transactions: Vec::new(),
        };
        let n = d.read_len()?;
        for _ in 0..n {
            let raw = d.read_bytes()?;
            block.transactions.push(registry.decode(codec, &raw)?);
        }
        d.finish()?;
        Ok(block)
    }

    /// Validates the block as a whole, then each of its transactions.
    ///
    /// `ctx` gives the height of this block; its time is taken from the block.
    pub fn validate(
        &self,
        registry: &TransactionRegistry,
        ctx: &ValidationContext,
    ) -> Result<(), InvalidBlock> {
        let size = self.encode(registry, Codec::Classic)?.len();
        let max = ctx.constants.block_size_limit;
        if size as u64 > max {
            return Err(InvalidBlock::TooLarge { size, max });
        }
        if let Some(i) = self.miner_payouts.iter().position(|mp| mp.value.is_zero()) {
            return Err(InvalidBlock::ZeroMinerPayout(i));
        }
        self.check_double_spends()?;
        self.validate_transactions(registry, ctx)
    }

    /// Validates all transactions in parallel, as confirmed transactions
    /// at the height of `ctx` and the time of this block.
    /// Reports the lowest index that failed.
    pub fn validate_transactions(
        &self,
        registry: &TransactionRegistry,
        ctx: &ValidationContext,
    ) -> Result<(), InvalidBlock> {
        let ctx = ValidationContext {
            block_time: self.timestamp,
            confirmed: true,
            ..*ctx
        };
        let failed = self
            .transactions
            .par_iter()
            .enumerate()
            .filter_map(|(index, tx)| registry.validate(tx, &ctx).err().map(|e| (index, e)))
            .min_by_key(|(index, _)| *index);
        match failed {
            Some((index, source)) => {
                debug!("block transaction {} failed validation: {}", index, source);
                Err(InvalidBlock::Transaction { index, source })
            }
            None => Ok(()),
        }
    }

    fn check_double_spends(&self) -> Result<(), InvalidBlock> {
        let mut coins = HashSet::new();
        let mut stakes = HashSet::new();
        for tx in &self.transactions {
            for ci in &tx.coin_inputs {
                if !coins.insert(ci.parent_id) {
                    return Err(InvalidBlock::DoubleSpendCoin(ci.parent_id));
                }
            }
            for bsi in &tx.block_stake_inputs {
                if !stakes.insert(bsi.parent_id) {
                    return Err(InvalidBlock::DoubleSpendBlockStake(bsi.parent_id));
                }
            }
        }
        Ok(())
    }

    /// Adds the miner payouts to `outputs`, then applies every transaction in order.
    pub fn apply(
        &self,
        registry: &TransactionRegistry,
        outputs: &mut OutputSet,
    ) -> Result<(), InvalidBlock> {
        for (i, mp) in self.miner_payouts.iter().enumerate() {
            outputs.insert_coin_output(
                self.miner_payout_id(registry, i as u64)?,
                CoinOutput {
                    value: mp.value.clone(),
                    condition: Condition::from(mp.unlock_hash),
                },
            );
        }
        for tx in &self.transactions {
            outputs.apply_transaction(registry, tx)?;
        }
        Ok(())
    }
}

impl Encodable for BlockID {
    fn encode(&self, e: &mut Encoder) {
        self.0.encode(e);
    }
}

impl Decodable for BlockID {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(BlockID(d.read()?))
    }
}

impl Encodable for BlockStakeOutputIndexes {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.block_height);
        e.write_u64(self.transaction_index);
        e.write_u64(self.output_index);
    }
}

impl Decodable for BlockStakeOutputIndexes {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            block_height: d.read()?,
            transaction_index: d.read_u64()?,
            output_index: d.read_u64()?,
        })
    }
}

impl Encodable for MinerPayout {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.value);
        e.write(&self.unlock_hash);
    }
}

impl Decodable for MinerPayout {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        Ok(Self {
            value: d.read()?,
            unlock_hash: d.read()?,
        })
    }
}

impl Encodable for BlockHeader {
    fn encode(&self, e: &mut Encoder) {
        e.write(&self.parent_id);
        e.write(&self.pobs_output);
        e.write(&self.timestamp);
        e.write(&self.merkle_root);
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::Keypair;
    use rand::{thread_rng, RngCore};

    use super::*;
    use crate::config::ValidationConstants;
    use crate::crypto::PublicKey;
    use crate::data::transactions::{CoinInput, ValidationError};
    use crate::data::unlock::{Fulfillment, KeyMaterial};
    use crate::protocol::TRANSACTION_VERSION_ONE;

    fn new_kp() -> Keypair {
        let mut seed = [0; 32];
        thread_rng().fill_bytes(&mut seed);
        crypto::keypair_from_seed(&seed).unwrap()
    }

    fn address(kp: &Keypair) -> UnlockHash {
        UnlockHash::from_public_key(&PublicKey::from(kp))
    }

    /// A block paying `kp`, and the output set after applying it.
    fn genesis(registry: &TransactionRegistry, kp: &Keypair) -> (Block, OutputSet) {
        let block = Block {
            timestamp: Timestamp(1_600_000_000),
            miner_payouts: vec![MinerPayout {
                value: Currency::new(1000),
                unlock_hash: address(kp),
            }],
            ..Default::default()
        };
        let mut outputs = OutputSet::new();
        block.apply(registry, &mut outputs).unwrap();
        (block, outputs)
    }

    fn payment(
        registry: &TransactionRegistry,
        outputs: &OutputSet,
        parent: CoinOutputID,
        kp: &Keypair,
    ) -> Transaction {
        let mut tx = Transaction {
            coin_inputs: vec![CoinInput {
                parent_id: parent,
                fulfillment: Fulfillment::Nil,
            }],
            coin_outputs: vec![CoinOutput {
                value: Currency::new(990),
                condition: Condition::from(address(&new_kp())),
            }],
            miner_fees: vec![Currency::new(10)],
            ..Transaction::new(TRANSACTION_VERSION_ONE)
        };
        tx.sign_inputs(registry, outputs, |_| Some(KeyMaterial::Ed25519(kp)))
            .unwrap();
        tx
    }

    #[test]
    fn build_and_validate() {
        let registry = TransactionRegistry::standard();
        let constants = ValidationConstants::default();
        let kp = new_kp();
        let (genesis, outputs) = genesis(&registry, &kp);
        let payout = genesis.miner_payout_id(&registry, 0).unwrap();
        assert!(outputs.coin_outputs.contains_key(&payout));

        let prev = genesis.header(&registry).unwrap();
        let mut block = Block::new(&prev, BlockStakeOutputIndexes::default());
        block.transactions.push(payment(&registry, &outputs, payout, &kp));
        assert!(block.timestamp >= prev.timestamp);

        let header = block.header(&registry).unwrap();
        header.pre_check(&prev).unwrap();
        assert!(matches!(
            prev.pre_check(&header),
            Err(InvalidBlock::WrongParent(_, _))
        ));

        let ctx = ValidationContext::new(&constants, &outputs, BlockHeight(1), Timestamp(0));
        block.validate(&registry, &ctx).unwrap();

        let bytes = block.encode(&registry, Codec::Compact).unwrap();
        assert_eq!(Block::decode(&registry, Codec::Compact, &bytes).unwrap(), block);
    }

    #[test]
    fn merkle_root_commits_to_transactions() {
        let registry = TransactionRegistry::standard();
        let kp = new_kp();
        let (genesis, outputs) = genesis(&registry, &kp);
        let payout = genesis.miner_payout_id(&registry, 0).unwrap();

        let empty = Block::default();
        assert!(empty.merkle_root(&registry).unwrap().is_zero());

        let mut block = Block::default();
        block.transactions.push(payment(&registry, &outputs, payout, &kp));
        let root = block.merkle_root(&registry).unwrap();
        assert!(!root.is_zero());

        block.transactions[0].arbitrary_data = b"changed".to_vec().into();
        assert_ne!(block.merkle_root(&registry).unwrap(), root);
    }

    #[test]
    fn invalid_blocks() {
        let registry = TransactionRegistry::standard();
        let constants = ValidationConstants::default();
        let kp = new_kp();
        let (genesis, outputs) = genesis(&registry, &kp);
        let payout = genesis.miner_payout_id(&registry, 0).unwrap();
        let ctx = ValidationContext::new(&constants, &outputs, BlockHeight(1), Timestamp(0));

        let tx = payment(&registry, &outputs, payout, &kp);
        let mut block = Block {
            transactions: vec![tx.clone(), tx],
            ..Default::default()
        };
        assert!(matches!(
            block.validate(&registry, &ctx),
            Err(InvalidBlock::DoubleSpendCoin(id)) if id == payout
        ));

        block.transactions.truncate(1);
        block.miner_payouts.push(MinerPayout::default());
        assert!(matches!(
            block.validate(&registry, &ctx),
            Err(InvalidBlock::ZeroMinerPayout(0))
        ));

        block.miner_payouts.clear();
        block.transactions[0].miner_fees[0] = Currency::new(11);
        assert!(matches!(
            block.validate(&registry, &ctx),
            Err(InvalidBlock::Transaction { index: 0, source: ValidationError::UnauthorizedCoinInput { .. } })
        ));

        let tiny = ValidationConstants {
            block_size_limit: 10,
            ..ValidationConstants::default()
        };
        let ctx = ValidationContext::new(&tiny, &outputs, BlockHeight(1), Timestamp(0));
        assert!(matches!(
            block.validate(&registry, &ctx),
            Err(InvalidBlock::TooLarge { max: 10, .. })
        ));
    }
}
