use crate::*;
use curve25519_dalek::traits::Identity;
use zkhe_primitives::{ADDRESS_TYPE_TAG, input_proof_len, parse_input_proof};

fn network_pk() -> RistrettoPoint {
    Scalar::from(77u64) * G
}

fn input(values: Vec<AddressBytes>) -> AddressInput {
    let mut seed = [0u8; 32];
    seed[0] = 7;
    AddressInput {
        contract: [0xC0; 20],
        submitter: [0x5B; 20],
        network_pk: network_pk(),
        values,
        rng_seed: seed,
    }
}

#[test]
fn batch_shapes() {
    let out = prove_address_input(&input(vec![[0xAA; 20], [0xBB; 20]])).expect("prove");

    assert_eq!(out.handles.len(), 2);
    assert_eq!(out.ciphertexts.len(), 2);
    assert_eq!(out.input_proof.len(), input_proof_len(2));
    assert_eq!(out.handles[0][30], 0);
    assert_eq!(out.handles[1][30], 1);
    assert!(out.handles.iter().all(|h| h[31] == ADDRESS_TYPE_TAG));

    // ciphertexts are embedded in the proof in handle order
    let parsed = parse_input_proof(&out.input_proof).expect("parse");
    assert_eq!(parsed.ciphertexts[0].to_bytes(), out.ciphertexts[0]);
    assert_eq!(parsed.ciphertexts[1].to_bytes(), out.ciphertexts[1]);
}

#[test]
fn ciphertext_decrypts_to_address_point() {
    let sk = Scalar::from(77u64);
    let value = [0x42; 20];
    let out = prove_address_input(&input(vec![value])).expect("prove");

    let ct = Ciphertext::from_bytes(&out.ciphertexts[0]).expect("ct");
    // D - sk*C = mG
    assert_eq!(ct.D - sk * ct.C, zkhe_primitives::address_point(&value));
}

#[test]
fn same_seed_is_deterministic_and_fresh_seed_is_not() {
    let a = prove_address_input(&input(vec![[0xAA; 20]])).unwrap();
    let b = prove_address_input(&input(vec![[0xAA; 20]])).unwrap();
    assert_eq!(a.handles, b.handles);
    assert_eq!(a.input_proof, b.input_proof);

    let mut other = input(vec![[0xAA; 20]]);
    other.rng_seed = [9u8; 32];
    let c = prove_address_input(&other).unwrap();
    assert_ne!(a.handles, c.handles);
}

#[test]
fn handles_are_bound_to_submitter_and_contract() {
    let base = prove_address_input(&input(vec![[0xAA; 20]])).unwrap();

    let mut other_submitter = input(vec![[0xAA; 20]]);
    other_submitter.submitter = [0x5C; 20];
    let s = prove_address_input(&other_submitter).unwrap();
    assert_ne!(base.handles, s.handles);

    let mut other_contract = input(vec![[0xAA; 20]]);
    other_contract.contract = [0xC1; 20];
    let c = prove_address_input(&other_contract).unwrap();
    assert_ne!(base.handles, c.handles);
}

#[test]
fn rejects_bad_batches() {
    assert!(matches!(
        prove_address_input(&input(vec![])),
        Err(ProverError::InvalidInput(_))
    ));
    assert!(matches!(
        prove_address_input(&input(vec![[1; 20]; MAX_BATCH + 1])),
        Err(ProverError::InvalidInput(_))
    ));
    assert!(matches!(
        prove_address_input(&input(vec![[0; 20]])),
        Err(ProverError::InvalidInput("zero address value"))
    ));

    let mut zero_contract = input(vec![[1; 20]]);
    zero_contract.contract = [0; 20];
    assert!(prove_address_input(&zero_contract).is_err());

    let mut identity_key = input(vec![[1; 20]]);
    identity_key.network_pk = RistrettoPoint::identity();
    assert!(matches!(
        prove_address_input(&identity_key),
        Err(ProverError::Malformed(_))
    ));
}

#[test]
fn encryptor_builds_one_proof_per_batch() {
    let encryptor = ZkheEncryptor::new(network_pk()).with_seed([3u8; 32]);
    let contract = Address::from_bytes([0xC0; 20]);
    let submitter = Address::from_bytes([0x5B; 20]);

    let mut builder = encryptor
        .new_input_builder(&contract, &submitter)
        .expect("session");
    builder.add_identity(&Address::from_bytes([0xAA; 20]));
    builder.add_identity(&Address::from_bytes([0xBB; 20]));
    let first = builder.build().expect("build");
    assert_eq!(first.len(), 2);
    assert_eq!(first.proof().as_bytes().len(), input_proof_len(2));

    // a second batch of the same values gets fresh randomness
    let mut builder = encryptor.new_input_builder(&contract, &submitter).unwrap();
    builder.add_identity(&Address::from_bytes([0xAA; 20]));
    builder.add_identity(&Address::from_bytes([0xBB; 20]));
    let second = builder.build().unwrap();
    assert_ne!(first.handles(), second.handles());
}

#[test]
fn encryptor_without_session_refuses_to_bind() {
    let encryptor = ZkheEncryptor::detached();
    let err = encryptor
        .new_input_builder(&Address::from_bytes([1; 20]), &Address::from_bytes([2; 20]))
        .err()
        .expect("no session");
    assert!(matches!(err, EncodingError::NoSession(_)));
}

#[test]
fn empty_builder_is_rejected() {
    let encryptor = ZkheEncryptor::new(network_pk());
    let builder = encryptor
        .new_input_builder(&Address::from_bytes([1; 20]), &Address::from_bytes([2; 20]))
        .unwrap();
    assert!(matches!(builder.build(), Err(EncodingError::Rejected(_))));
}

#[test]
fn public_key_bytes_must_be_a_point() {
    assert!(ZkheEncryptor::from_public_key_bytes(&network_pk().compress().to_bytes()).is_ok());
    assert!(ZkheEncryptor::from_public_key_bytes(&[0u8; 32]).is_err());
}
