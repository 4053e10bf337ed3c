//! End-to-end write/read/decrypt scenarios with a five-member committee.

mod common;

use common::TestBed;
use rand::thread_rng;

use ocs::errors::OcsError;
use ocs::keys::Keypair;
use ocs::protocol;

#[test]
fn happy_path_recovers_payload() {
    let bed = TestBed::new(5);
    let plaintext = bed.roundtrip(b"hello world", 0).unwrap();
    assert_eq!(plaintext, b"hello world");
}

#[test]
fn threshold_boundary() {
    // n = 5 gives t = 4: one missing trustee is tolerated, two are not.
    let mut bed = TestBed::new(5);
    bed.disable_trustee(0);
    let plaintext = bed.roundtrip(b"hello world", 0).unwrap();
    assert_eq!(plaintext, b"hello world");

    bed.disable_trustee(1);
    match bed.roundtrip(b"hello world", 0) {
        Err(OcsError::TooFewShares { required, provided }) => {
            assert_eq!(required, 4);
            assert_eq!(provided, 3);
        }
        other => panic!("expected TooFewShares, got {other:?}"),
    }
}

#[test]
fn forged_reader_request_yields_no_shares() {
    let mut rng = thread_rng();
    let bed = TestBed::new(5);
    let (write_id, ciphertext) = bed.write(b"hello world");
    let read_id = bed.read(write_id);

    // Sign the decrypt request with a key other than the authorized reader's.
    let client = bed.client();
    let request = client
        .reader()
        .build_request(&bed.ledger, &write_id, &read_id)
        .unwrap();
    let imposter = Keypair::generate(&mut rng);
    let announce = client
        .reader()
        .build_announce(request, &imposter, 0, &mut rng);

    let replies = bed.run_decrypt(&announce);
    assert!(replies.iter().all(|r| r.is_none()));
    match bed.recover(&write_id, &replies, &ciphertext) {
        Err(OcsError::TooFewShares { provided, .. }) => assert_eq!(provided, 0),
        other => panic!("expected TooFewShares, got {other:?}"),
    }
}

#[test]
fn tampered_forward_link_yields_no_shares() {
    let bed = TestBed::new(5);
    let (write_id, ciphertext) = bed.write(b"hello world");
    let read_id = bed.read(write_id);

    let mut announce = bed.announce(&write_id, &read_id, 0);
    announce.request.inclusion_proof.hash[0] ^= 0x01;
    // The reader re-signs the mangled request so only the link check fails.
    let mut rng = thread_rng();
    let request = announce.request.clone();
    let announce = bed
        .client()
        .reader()
        .build_announce(request, &bed.reader, 0, &mut rng);

    let replies = bed.run_decrypt(&announce);
    assert!(replies.iter().all(|r| r.is_none()));
    assert!(matches!(
        bed.recover(&write_id, &replies, &ciphertext),
        Err(OcsError::TooFewShares { .. })
    ));
}

#[test]
fn replayed_read_recovers_identically() {
    let bed = TestBed::new(5);
    let (write_id, ciphertext) = bed.write(b"hello world");

    // Both appends of the same read succeed; recovery works through either.
    let first_read = bed.read(write_id);
    let second_read = bed.read(write_id);
    assert_ne!(first_read, second_read);

    for read_id in [first_read, second_read] {
        let announce = bed.announce(&write_id, &read_id, 0);
        let replies = bed.run_decrypt(&announce);
        let plaintext = bed.recover(&write_id, &replies, &ciphertext).unwrap();
        assert_eq!(plaintext, b"hello world");
    }
}

#[test]
fn root_rotation_is_transparent() {
    // Scenario 1 with a rotated root.
    let bed = TestBed::new(5);
    let plaintext = bed.roundtrip(b"hello world", 3).unwrap();
    assert_eq!(plaintext, b"hello world");

    // Every root choice produces the same plaintext.
    let (write_id, ciphertext) = bed.write(b"rotation");
    let read_id = bed.read(write_id);
    for root in 0..5 {
        let announce = bed.announce(&write_id, &read_id, root);
        let replies = bed.run_decrypt(&announce);
        assert_eq!(
            bed.recover(&write_id, &replies, &ciphertext).unwrap(),
            b"rotation"
        );
    }
}

#[test]
fn root_rotation_at_threshold_boundary() {
    // Scenario 2 with root_index = 3.
    let mut bed = TestBed::new(5);
    bed.disable_trustee(0);
    assert_eq!(bed.roundtrip(b"hello world", 3).unwrap(), b"hello world");

    bed.disable_trustee(1);
    assert!(matches!(
        bed.roundtrip(b"hello world", 3),
        Err(OcsError::TooFewShares { .. })
    ));
}

#[test]
fn full_threshold_committee_has_no_slack() {
    // n = 3 gives t = 3: every trustee is needed, one failure is fatal.
    let mut bed = TestBed::new(3);
    assert_eq!(bed.roundtrip(b"fragile", 0).unwrap(), b"fragile");

    bed.disable_trustee(2);
    assert!(matches!(
        bed.roundtrip(b"fragile", 0),
        Err(OcsError::TooFewShares { .. })
    ));
}

#[test]
fn out_of_range_root_index_is_rejected() {
    let bed = TestBed::new(5);
    let (write_id, _) = bed.write(b"payload");
    let read_id = bed.read(write_id);
    let announce = bed.announce(&write_id, &read_id, 7);
    assert!(matches!(
        protocol::run_decrypt(&bed.trustees, &announce, ocs::DEFAULT_TIMEOUT),
        Err(OcsError::Parameter(_))
    ));
}

#[test]
fn tampered_ciphertext_is_refused_before_decryption() {
    let bed = TestBed::new(5);
    let (write_id, mut ciphertext) = bed.write(b"hello world");
    let read_id = bed.read(write_id);
    let announce = bed.announce(&write_id, &read_id, 0);
    let replies = bed.run_decrypt(&announce);

    ciphertext[0] ^= 0xff;
    assert!(matches!(
        bed.recover(&write_id, &replies, &ciphertext),
        Err(OcsError::Protocol(_))
    ));
}

#[test]
fn read_requests_are_listed() {
    let bed = TestBed::new(5);
    let (write_id, _) = bed.write(b"listing");
    let first = bed.read(write_id);
    let second = bed.read(write_id);

    let docs = bed
        .ledger
        .read_requests(&bed.ledger.genesis().unwrap(), 10)
        .unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].read_id, first);
    assert_eq!(docs[1].read_id, second);
    assert!(docs.iter().all(|d| d.data_id == write_id));
    assert!(docs.iter().all(|d| d.reader_pk == bed.reader.pk));

    let limited = bed
        .ledger
        .read_requests(&bed.ledger.genesis().unwrap(), 1)
        .unwrap();
    assert_eq!(limited.len(), 1);
}
