// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use serde::{Deserialize, Serialize};

use super::*;
use crate::data::basics::{
    BlockHeight, Timestamp, UnlockHash, UnlockType, LOCK_TIME_MIN_TIMESTAMP_VALUE,
};
use crate::protocol::{CodecError, Decodable, Decoder, Encodable, Encoder};

/// Wraps another condition, which can only be fulfilled once the lock is reached.
///
/// Lock values below `LOCK_TIME_MIN_TIMESTAMP_VALUE` are block heights,
/// all others are unix timestamps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLockCondition {
    #[serde(rename = "locktime")]
    pub lock_time: u64,
    pub condition: Box<Condition>,
}

impl TimeLockCondition {
    pub fn new(lock_time: u64, condition: Condition) -> Self {
        Self {
            lock_time,
            condition: Box::new(condition),
        }
    }

    pub fn is_height_lock(&self) -> bool {
        self.lock_time < LOCK_TIME_MIN_TIMESTAMP_VALUE
    }

    /// Returns true iff the lock is reached at the given chain position.
    pub fn is_unlocked(&self, height: BlockHeight, time: Timestamp) -> bool {
        if self.is_height_lock() {
            BlockHeight(self.lock_time) <= height
        } else {
            Timestamp(self.lock_time) <= time
        }
    }

    /// Time locks share the address of the condition they wrap.
    pub fn unlock_hash(&self) -> UnlockHash {
        self.condition.unlock_hash()
    }

    pub(super) fn fulfill(
        &self,
        fulfillment: &Fulfillment,
        ctx: &FulfillContext,
    ) -> Result<(), AuthorizationError> {
        if !self.is_unlocked(ctx.block_height, ctx.block_time) {
            return Err(AuthorizationError::PrematureTimeLock(self.lock_time));
        }
        self.condition.fulfill(fulfillment, ctx)
    }

    pub(super) fn is_standard(&self) -> bool {
        if self.lock_time == 0 {
            return false;
        }
        match self.condition.as_ref() {
            Condition::Nil => true,
            Condition::UnlockHash(c) => {
                c.target.unlock_type == UnlockType::PUBLIC_KEY && !c.target.hash.is_zero()
            }
            Condition::MultiSignature(c) => c.is_standard(),
            _ => false,
        }
    }
}

impl Encodable for TimeLockCondition {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(self.lock_time);
        e.write_u8(self.condition.condition_type());
        self.condition.encode_body(e);
    }
}

/// The wrapped condition is not length-prefixed, it takes up the rest of the input.
impl Decodable for TimeLockCondition {
    fn decode(d: &mut Decoder) -> Result<Self, CodecError> {
        let lock_time = d.read_u64()?;
        let condition_type = d.read_u8()?;
        check_wrapped_type(condition_type).map_err(CodecError::InvalidValue)?;
        let condition = Condition::decode_body(condition_type, d)?;
        Ok(Self::new(lock_time, condition))
    }
}

/// Time locks cannot be nested, which also bounds the decoding depth.
pub(super) fn check_wrapped_type(condition_type: u8) -> Result<(), String> {
    if condition_type == CONDITION_TYPE_TIME_LOCK {
        return Err("a time lock cannot wrap another time lock".into());
    }
    Ok(())
}
