// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use ed25519_dalek::Keypair;
use rand::{thread_rng, RngCore};

use super::*;
use crate::crypto::{self, hash, hash_all, CryptoHash, PublicKey, SignatureError};
use crate::data::basics::{BlockHeight, Timestamp, UnlockHash, UnlockType, NIL_UNLOCK_HASH};
use crate::protocol::{decode, encode, Codec, CodecError};

/// Stands in for a transaction: the signature hash covers a fixed id and the extra objects.
struct TestTx(CryptoHash);

impl SignatureHasher for TestTx {
    fn signature_hash(&self, extra_objects: &[ExtraObject]) -> Result<CryptoHash, SignatureHashError> {
        Ok(hash_all(&[&self.0, &extra_objects.to_vec()]))
    }
}

fn new_tx() -> TestTx {
    let mut seed = [0; 32];
    thread_rng().fill_bytes(&mut seed);
    TestTx(hash(&seed))
}

fn new_kp() -> Keypair {
    let mut seed = [0; 32];
    thread_rng().fill_bytes(&mut seed);
    crypto::keypair_from_seed(&seed).unwrap()
}

fn address(kp: &Keypair) -> UnlockHash {
    UnlockHash::from_public_key(&PublicKey::from(kp))
}

fn fulfill_ctx(tx: &TestTx, height: u64, time: u64) -> FulfillContext<'_> {
    FulfillContext {
        block_height: BlockHeight(height),
        block_time: Timestamp(time),
        transaction: tx,
    }
}

fn sign_ctx(tx: &TestTx) -> SignContext<'_> {
    SignContext { transaction: tx }
}

fn single_sig(tx: &TestTx, kp: &Keypair) -> Fulfillment {
    Fulfillment::SingleSignature(SingleSignatureFulfillment::sign(kp, &sign_ctx(tx)).unwrap())
}

#[test]
fn nil_condition_accepts_any_single_signature() {
    let tx = new_tx();
    let f = single_sig(&tx, &new_kp());
    assert_eq!(Condition::Nil.fulfill(&f, &fulfill_ctx(&tx, 0, 0)), Ok(()));

    // signature over another transaction
    let other = new_tx();
    assert!(matches!(
        Condition::Nil.fulfill(&f, &fulfill_ctx(&other, 0, 0)),
        Err(AuthorizationError::InvalidSignature(SignatureError::VerificationFailed))
    ));
    assert_eq!(
        Condition::Nil.fulfill(&Fulfillment::Nil, &fulfill_ctx(&tx, 0, 0)),
        Err(AuthorizationError::NilFulfillment)
    );
}

#[test]
fn unlock_hash_condition() {
    let tx = new_tx();
    let kp = new_kp();
    let condition = Condition::from(address(&kp));
    let ctx = fulfill_ctx(&tx, 10, 10);

    let f = condition.sign(KeyMaterial::Ed25519(&kp), &sign_ctx(&tx)).unwrap();
    assert_eq!(condition.fulfill(&f, &ctx), Ok(()));

    let intruder = new_kp();
    assert_eq!(
        condition.sign(KeyMaterial::Ed25519(&intruder), &sign_ctx(&tx)),
        Err(SigningError::UnauthorizedKey(address(&intruder)))
    );
    assert_eq!(
        condition.fulfill(&single_sig(&tx, &intruder), &ctx),
        Err(AuthorizationError::WrongSigner {
            expected: address(&kp),
            actual: address(&intruder),
        })
    );

    // all-zero signature
    let forged = Fulfillment::SingleSignature(SingleSignatureFulfillment {
        public_key: PublicKey::from(&kp),
        signature: vec![0; 64].into(),
    });
    assert!(matches!(
        condition.fulfill(&forged, &ctx),
        Err(AuthorizationError::InvalidSignature(_))
    ));
}

#[test]
fn nil_unlock_hash_is_nil_condition() {
    assert_eq!(Condition::from(NIL_UNLOCK_HASH), Condition::Nil);
    assert_eq!(Condition::Nil.unlock_hash(), NIL_UNLOCK_HASH);
}

struct Swap {
    sender: Keypair,
    receiver: Keypair,
    secret: AtomicSwapSecret,
    condition: Condition,
}

const LOCK: u64 = 1_600_000_000;

fn new_swap() -> Swap {
    let sender = new_kp();
    let receiver = new_kp();
    let secret = AtomicSwapSecret::random();
    let condition = Condition::AtomicSwap(AtomicSwapCondition {
        sender: address(&sender),
        receiver: address(&receiver),
        hashed_secret: AtomicSwapHashedSecret::from(&secret),
        time_lock: Timestamp(LOCK),
    });
    Swap {
        sender,
        receiver,
        secret,
        condition,
    }
}

#[test]
fn atomic_swap_claim_window_is_inclusive() {
    let tx = new_tx();
    let swap = new_swap();
    let claim = swap
        .condition
        .sign(
            KeyMaterial::AtomicSwapClaim(&swap.receiver, swap.secret),
            &sign_ctx(&tx),
        )
        .unwrap();

    assert_eq!(swap.condition.fulfill(&claim, &fulfill_ctx(&tx, 0, LOCK)), Ok(()));
    assert_eq!(
        swap.condition.fulfill(&claim, &fulfill_ctx(&tx, 0, LOCK + 1)),
        Err(AuthorizationError::WrongSigner {
            expected: address(&swap.sender),
            actual: address(&swap.receiver),
        })
    );
}

#[test]
fn atomic_swap_refund_after_lock() {
    let tx = new_tx();
    let swap = new_swap();
    let refund = swap
        .condition
        .sign(KeyMaterial::Ed25519(&swap.sender), &sign_ctx(&tx))
        .unwrap();

    assert_eq!(
        swap.condition.fulfill(&refund, &fulfill_ctx(&tx, 0, LOCK)),
        Err(AuthorizationError::WrongSigner {
            expected: address(&swap.receiver),
            actual: address(&swap.sender),
        })
    );
    assert_eq!(
        swap.condition.fulfill(&refund, &fulfill_ctx(&tx, 0, LOCK + 1)),
        Ok(())
    );
}

#[test]
fn atomic_swap_secret_is_checked() {
    let tx = new_tx();
    let swap = new_swap();
    let wrong = AtomicSwapSecret::random();

    assert_eq!(
        swap.condition.sign(
            KeyMaterial::AtomicSwapClaim(&swap.receiver, wrong),
            &sign_ctx(&tx)
        ),
        Err(SigningError::InvalidSecret)
    );

    // correctly signed, but revealing the wrong secret
    let pk = PublicKey::from(&swap.receiver);
    let sig_hash = tx
        .signature_hash(&[ExtraObject::PublicKey(pk.clone()), ExtraObject::Secret(wrong)])
        .unwrap();
    let f = Fulfillment::AtomicSwap(AtomicSwapFulfillment {
        public_key: pk.clone(),
        signature: crypto::sign_hash(&swap.receiver, &sig_hash).into(),
        secret: Some(wrong),
    });
    assert_eq!(
        swap.condition.fulfill(&f, &fulfill_ctx(&tx, 0, LOCK - 1)),
        Err(AuthorizationError::InvalidSecret)
    );

    let sig_hash = tx.signature_hash(&[ExtraObject::PublicKey(pk.clone())]).unwrap();
    let f = Fulfillment::AtomicSwap(AtomicSwapFulfillment {
        public_key: pk,
        signature: crypto::sign_hash(&swap.receiver, &sig_hash).into(),
        secret: None,
    });
    assert_eq!(
        swap.condition.fulfill(&f, &fulfill_ctx(&tx, 0, LOCK)),
        Err(AuthorizationError::MissingSecret)
    );
}

#[test]
fn legacy_atomic_swap_fulfills_its_unlock_hash() {
    let tx = new_tx();
    let swap = new_swap();
    let inner = match &swap.condition {
        Condition::AtomicSwap(c) => c.clone(),
        _ => unreachable!(),
    };
    let claim = match swap
        .condition
        .sign(
            KeyMaterial::AtomicSwapClaim(&swap.receiver, swap.secret),
            &sign_ctx(&tx),
        )
        .unwrap()
    {
        Fulfillment::AtomicSwap(f) => f,
        _ => unreachable!(),
    };
    let legacy = Fulfillment::LegacyAtomicSwap(LegacyAtomicSwapFulfillment {
        sender: inner.sender,
        receiver: inner.receiver,
        hashed_secret: inner.hashed_secret,
        time_lock: inner.time_lock,
        public_key: claim.public_key,
        signature: claim.signature,
        secret: claim.secret,
    });

    let by_hash = Condition::from(swap.condition.unlock_hash());
    assert_eq!(swap.condition.unlock_hash().unlock_type, UnlockType::ATOMIC_SWAP);
    assert_eq!(by_hash.fulfill(&legacy, &fulfill_ctx(&tx, 0, LOCK)), Ok(()));
    assert_eq!(swap.condition.fulfill(&legacy, &fulfill_ctx(&tx, 0, LOCK)), Ok(()));

    let other = Condition::from(new_swap().condition.unlock_hash());
    assert_eq!(
        other.fulfill(&legacy, &fulfill_ctx(&tx, 0, LOCK)),
        Err(AuthorizationError::ConditionMismatch)
    );
}

#[test]
fn time_lock_on_height() {
    let tx = new_tx();
    let kp = new_kp();
    let condition = Condition::TimeLock(TimeLockCondition::new(100, Condition::from(address(&kp))));
    let f = condition.sign(KeyMaterial::Ed25519(&kp), &sign_ctx(&tx)).unwrap();

    assert_eq!(
        condition.fulfill(&f, &fulfill_ctx(&tx, 99, LOCK)),
        Err(AuthorizationError::PrematureTimeLock(100))
    );
    assert_eq!(condition.fulfill(&f, &fulfill_ctx(&tx, 100, 0)), Ok(()));
    assert_eq!(condition.unlock_hash(), address(&kp));
}

#[test]
fn time_lock_on_timestamp() {
    let tx = new_tx();
    let kp = new_kp();
    let condition = Condition::TimeLock(TimeLockCondition::new(LOCK, Condition::Nil));
    let f = single_sig(&tx, &kp);

    assert!(!condition.fulfillable(&fulfill_ctx(&tx, LOCK, LOCK - 1).fulfillable()));
    assert_eq!(
        condition.fulfill(&f, &fulfill_ctx(&tx, LOCK, LOCK - 1)),
        Err(AuthorizationError::PrematureTimeLock(LOCK))
    );
    assert!(condition.fulfillable(&fulfill_ctx(&tx, 0, LOCK).fulfillable()));
    assert_eq!(condition.fulfill(&f, &fulfill_ctx(&tx, 0, LOCK)), Ok(()));
}

fn new_multisig(n: usize, min: u64) -> (Vec<Keypair>, MultiSignatureCondition) {
    let keys: Vec<Keypair> = (0..n).map(|_| new_kp()).collect();
    let condition = MultiSignatureCondition::new(keys.iter().map(address).collect(), min);
    (keys, condition)
}

#[test]
fn multisig_two_of_three() {
    let tx = new_tx();
    let (keys, ms) = new_multisig(3, 2);
    let condition = Condition::MultiSignature(ms.clone());
    let ctx = fulfill_ctx(&tx, 0, 0);

    let f = condition
        .sign(KeyMaterial::MultiSignature(&keys[..2]), &sign_ctx(&tx))
        .unwrap();
    assert_eq!(condition.fulfill(&f, &ctx), Ok(()));

    let partial = condition
        .sign(KeyMaterial::Ed25519(&keys[2]), &sign_ctx(&tx))
        .unwrap();
    assert_eq!(
        condition.fulfill(&partial, &ctx),
        Err(AuthorizationError::InsufficientSignatures {
            required: 2,
            provided: 1,
        })
    );

    // co-sign the partial fulfillment
    let mut msf = match partial {
        Fulfillment::MultiSignature(msf) => msf,
        _ => unreachable!(),
    };
    assert_eq!(
        msf.add_signature(&ms, &keys[2], &sign_ctx(&tx)),
        Err(SigningError::DuplicateKey(address(&keys[2])))
    );
    msf.add_signature(&ms, &keys[0], &sign_ctx(&tx)).unwrap();
    assert_eq!(
        condition.fulfill(&Fulfillment::MultiSignature(msf), &ctx),
        Ok(())
    );
}

#[test]
fn multisig_rejects_duplicate_and_foreign_keys() {
    let tx = new_tx();
    let (keys, ms) = new_multisig(3, 2);
    let condition = Condition::MultiSignature(ms);
    let ctx = fulfill_ctx(&tx, 0, 0);

    let pair = |kp: &Keypair| {
        let pk = PublicKey::from(kp);
        let sig_hash = tx.signature_hash(&[ExtraObject::PublicKey(pk.clone())]).unwrap();
        PublicKeySignaturePair {
            public_key: pk,
            signature: crypto::sign_hash(kp, &sig_hash).into(),
        }
    };

    let duplicate = Fulfillment::MultiSignature(MultiSignatureFulfillment {
        pairs: vec![pair(&keys[0]), pair(&keys[0])],
    });
    assert_eq!(
        condition.fulfill(&duplicate, &ctx),
        Err(AuthorizationError::DuplicatePublicKey(address(&keys[0])))
    );

    let outsider = new_kp();
    let foreign = Fulfillment::MultiSignature(MultiSignatureFulfillment {
        pairs: vec![pair(&keys[0]), pair(&outsider)],
    });
    assert_eq!(
        condition.fulfill(&foreign, &ctx),
        Err(AuthorizationError::UnauthorizedPublicKey(address(&outsider)))
    );

    let mut broken = pair(&keys[1]);
    broken.signature.0[0] ^= 1;
    let bad_sig = Fulfillment::MultiSignature(MultiSignatureFulfillment {
        pairs: vec![pair(&keys[0]), broken],
    });
    assert!(matches!(
        condition.fulfill(&bad_sig, &ctx),
        Err(AuthorizationError::InvalidSignature(_))
    ));

    assert_eq!(
        condition.fulfill(&single_sig(&tx, &keys[0]), &ctx),
        Err(AuthorizationError::UnexpectedFulfillment {
            condition: CONDITION_TYPE_MULTI_SIGNATURE,
            fulfillment: FULFILLMENT_TYPE_SINGLE_SIGNATURE,
        })
    );
}

#[test]
fn multisig_unlock_hash_ignores_order() {
    let (_, ms) = new_multisig(4, 3);
    let mut reversed = ms.clone();
    reversed.unlock_hashes.reverse();
    assert_eq!(ms.unlock_hash(), reversed.unlock_hash());
    assert_eq!(ms.unlock_hash().unlock_type, UnlockType::MULTI_SIG);

    let mut other_min = ms.clone();
    other_min.min_signatures = 2;
    assert_ne!(ms.unlock_hash(), other_min.unlock_hash());
}

#[test]
fn unlock_hash_is_pure() {
    let swap = new_swap();
    assert_eq!(swap.condition.unlock_hash(), swap.condition.clone().unlock_hash());

    let kp = new_kp();
    let a = Condition::from(address(&kp));
    let b = Condition::TimeLock(TimeLockCondition::new(5, a.clone()));
    assert_eq!(a.unlock_hash(), b.unlock_hash());
}

fn sample_conditions() -> Vec<Condition> {
    let (_, ms) = new_multisig(2, 1);
    vec![
        Condition::Nil,
        Condition::from(address(&new_kp())),
        new_swap().condition,
        Condition::TimeLock(TimeLockCondition::new(42, Condition::MultiSignature(ms.clone()))),
        Condition::MultiSignature(ms),
        Condition::Unknown(UnknownCondition {
            condition_type: 42,
            payload: vec![1, 2, 3, 4],
        }),
    ]
}

fn sample_fulfillments() -> Vec<Fulfillment> {
    let tx = new_tx();
    let swap = new_swap();
    let (keys, ms) = new_multisig(2, 2);
    let claim = swap
        .condition
        .sign(
            KeyMaterial::AtomicSwapClaim(&swap.receiver, swap.secret),
            &sign_ctx(&tx),
        )
        .unwrap();
    let refund = swap
        .condition
        .sign(KeyMaterial::Ed25519(&swap.sender), &sign_ctx(&tx))
        .unwrap();
    vec![
        Fulfillment::Nil,
        single_sig(&tx, &new_kp()),
        claim,
        refund,
        Fulfillment::LegacyAtomicSwap(LegacyAtomicSwapFulfillment {
            sender: address(&swap.sender),
            receiver: address(&swap.receiver),
            hashed_secret: AtomicSwapHashedSecret::from(&swap.secret),
            time_lock: Timestamp(LOCK),
            public_key: PublicKey::from(&swap.receiver),
            signature: vec![7; 64].into(),
            secret: Some(swap.secret),
        }),
        Condition::MultiSignature(ms)
            .sign(KeyMaterial::MultiSignature(&keys), &sign_ctx(&tx))
            .unwrap(),
        Fulfillment::Unknown(UnknownFulfillment {
            fulfillment_type: 200,
            payload: vec![9; 3],
        }),
    ]
}

#[test]
fn conditions_survive_every_encoding() {
    for c in sample_conditions() {
        for &codec in &[Codec::Classic, Codec::Compact] {
            let b = encode(codec, &c).unwrap();
            assert_eq!(decode::<Condition>(codec, &b).unwrap(), c);
        }
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(serde_json::from_str::<Condition>(&json).unwrap(), c);
    }
}

#[test]
fn fulfillments_survive_every_encoding() {
    for f in sample_fulfillments() {
        for &codec in &[Codec::Classic, Codec::Compact] {
            let b = encode(codec, &f).unwrap();
            assert_eq!(decode::<Fulfillment>(codec, &b).unwrap(), f);
        }
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(serde_json::from_str::<Fulfillment>(&json).unwrap(), f);
    }
}

#[test]
fn nested_time_locks_are_rejected() {
    // a long chain of time locks, each wrapping the next, ending in a nil condition
    let mut payload = Vec::new();
    for _ in 0..200_000 {
        payload.extend_from_slice(&1u64.to_le_bytes());
        payload.push(CONDITION_TYPE_TIME_LOCK);
    }
    payload.extend_from_slice(&1u64.to_le_bytes());
    payload.push(CONDITION_TYPE_NIL);
    let mut raw = vec![CONDITION_TYPE_TIME_LOCK];
    raw.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    raw.extend_from_slice(&payload);
    assert!(matches!(
        decode::<Condition>(Codec::Classic, &raw),
        Err(CodecError::InvalidValue(_))
    ));

    let nested = Condition::TimeLock(TimeLockCondition::new(
        1,
        Condition::TimeLock(TimeLockCondition::new(2, Condition::Nil)),
    ));
    for &codec in &[Codec::Classic, Codec::Compact] {
        let b = encode(codec, &nested).unwrap();
        assert!(decode::<Condition>(codec, &b).is_err());
    }
    let json = serde_json::to_string(&nested).unwrap();
    assert!(serde_json::from_str::<Condition>(&json).is_err());

    // a single time lock still decodes
    let single = Condition::TimeLock(TimeLockCondition::new(1, Condition::Nil));
    let b = encode(Codec::Classic, &single).unwrap();
    assert_eq!(decode::<Condition>(Codec::Classic, &b).unwrap(), single);
}

#[test]
fn short_ed25519_keys_do_not_encode_compactly() {
    let f = Fulfillment::SingleSignature(SingleSignatureFulfillment {
        public_key: "ed25519:0102".parse().unwrap(),
        signature: vec![7; 64].into(),
    });
    let json = serde_json::to_string(&f).unwrap();
    assert_eq!(serde_json::from_str::<Fulfillment>(&json).unwrap(), f);

    let classic = encode(Codec::Classic, &f).unwrap();
    assert_eq!(decode::<Fulfillment>(Codec::Classic, &classic).unwrap(), f);
    assert_eq!(
        encode(Codec::Compact, &f),
        Err(CodecError::WrongLength {
            expected: 32,
            actual: 2
        })
    );
}

#[test]
fn unknown_types_are_relayed_but_never_fulfilled() {
    // tag 9, followed by a 3-byte payload
    let mut raw = vec![9];
    raw.extend_from_slice(&3u64.to_le_bytes());
    raw.extend_from_slice(&[0xaa, 0xbb, 0xcc]);

    let c: Condition = decode(Codec::Classic, &raw).unwrap();
    assert_eq!(
        c,
        Condition::Unknown(UnknownCondition {
            condition_type: 9,
            payload: vec![0xaa, 0xbb, 0xcc],
        })
    );
    assert_eq!(encode(Codec::Classic, &c).unwrap(), raw);
    assert_eq!(c.unlock_hash(), c.clone().unlock_hash());
    assert_eq!(c.unlock_hash().unlock_type, UnlockType::CUSTOM);

    let tx = new_tx();
    let f = single_sig(&tx, &new_kp());
    assert_eq!(
        c.fulfill(&f, &fulfill_ctx(&tx, 0, 0)),
        Err(AuthorizationError::UnknownConditionType(9))
    );
    assert!(!c.is_standard());

    let f: Fulfillment = decode(Codec::Classic, &raw).unwrap();
    assert_eq!(encode(Codec::Classic, &f).unwrap(), raw);
    assert_eq!(
        Condition::Nil.fulfill(&f, &fulfill_ctx(&tx, 0, 0)),
        Err(AuthorizationError::UnknownFulfillmentType(9))
    );
}

#[test]
fn json_proxy_shape() {
    let kp = new_kp();
    let c = Condition::from(address(&kp));
    assert_eq!(
        serde_json::to_value(&c).unwrap(),
        serde_json::json!({
            "type": 1,
            "condition": { "unlockhash": address(&kp).to_string() },
        })
    );
    assert_eq!(serde_json::to_string(&Condition::Nil).unwrap(), r#"{"type":0}"#);
    assert_eq!(serde_json::from_str::<Condition>("{}").unwrap(), Condition::Nil);

    let unknown = Condition::Unknown(UnknownCondition {
        condition_type: 77,
        payload: b"hi".to_vec(),
    });
    assert_eq!(
        serde_json::to_string(&unknown).unwrap(),
        r#"{"type":77,"condition":"aGk="}"#
    );
}

#[test]
fn atomic_swap_json_layout_must_not_mix() {
    let kp = new_kp();
    let json = serde_json::json!({
        "type": 2,
        "fulfillment": {
            "sender": address(&kp).to_string(),
            "publickey": PublicKey::from(&kp).to_string(),
            "signature": "00",
        },
    });
    assert!(serde_json::from_value::<Fulfillment>(json).is_err());
}

#[test]
fn wrong_key_material() {
    let tx = new_tx();
    let swap = new_swap();
    let keys = vec![new_kp()];
    assert_eq!(
        swap.condition
            .sign(KeyMaterial::MultiSignature(&keys), &sign_ctx(&tx)),
        Err(SigningError::UnexpectedKeyMaterial(CONDITION_TYPE_ATOMIC_SWAP))
    );
    let unknown = Condition::Unknown(UnknownCondition {
        condition_type: 8,
        payload: Vec::new(),
    });
    assert_eq!(
        unknown.sign(KeyMaterial::Ed25519(&keys[0]), &sign_ctx(&tx)),
        Err(SigningError::UnknownConditionType(8))
    );
}

#[test]
fn standardness() {
    let tx = new_tx();
    let kp = new_kp();
    assert!(Condition::Nil.is_standard());
    assert!(Condition::from(address(&kp)).is_standard());
    assert!(!Condition::from(UnlockHash::new(UnlockType::CUSTOM, hash(b"x"))).is_standard());
    assert!(new_swap().condition.is_standard());

    let (_, ms) = new_multisig(2, 3);
    assert!(!Condition::MultiSignature(ms).is_standard());
    assert!(!Condition::TimeLock(TimeLockCondition::new(0, Condition::Nil)).is_standard());
    assert!(!Condition::TimeLock(TimeLockCondition::new(1, new_swap().condition)).is_standard());

    assert!(single_sig(&tx, &kp).is_standard());
    assert!(!Fulfillment::Nil.is_standard());
    let short = Fulfillment::SingleSignature(SingleSignatureFulfillment {
        public_key: PublicKey::from(&kp),
        signature: vec![1; 10].into(),
    });
    assert!(!short.is_standard());
}
