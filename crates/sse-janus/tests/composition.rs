//! End-to-end tests for the composed scheme

use sse_core::crypto::punct::{Ciphertext, KeyShare};
use sse_core::MemoryEdb;
use sse_janus::{JanusClient, JanusServer};

fn new_server() -> JanusServer<MemoryEdb<Ciphertext>, MemoryEdb<KeyShare>> {
    JanusServer::new(MemoryEdb::new(), MemoryEdb::new())
}

#[test]
fn test_insert_then_search() {
    let mut client = JanusClient::new([0x11u8; 32]);
    let server = new_server();

    for index in [1u64, 2, 3] {
        server.insert(&client.insertion_request("alpha", index).unwrap()).unwrap();
    }
    server.flush().unwrap();

    let mut results = server.search(&client.search_request("alpha").unwrap()).unwrap();
    results.sort_unstable();
    assert_eq!(results, vec![1, 2, 3]);
}

#[test]
fn test_deletion_hides_match() {
    let mut client = JanusClient::new([0x12u8; 32]);
    let server = new_server();

    server.insert(&client.insertion_request("alpha", 42).unwrap()).unwrap();
    server.remove(&client.deletion_request("alpha", 42).unwrap()).unwrap();

    let results = server.search(&client.search_request("alpha").unwrap()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_deletion_preserves_other_matches() {
    let mut client = JanusClient::new([0x13u8; 32]);
    let server = new_server();

    for index in [7u64, 8, 9] {
        server.insert(&client.insertion_request("alpha", index).unwrap()).unwrap();
    }
    server.remove(&client.deletion_request("alpha", 8).unwrap()).unwrap();

    let mut results = server.search(&client.search_request("alpha").unwrap()).unwrap();
    results.sort_unstable();
    assert_eq!(results, vec![7, 9]);
}

#[test]
fn test_deletion_is_scoped_to_keyword() {
    let mut client = JanusClient::new([0x14u8; 32]);
    let server = new_server();

    server.insert(&client.insertion_request("alpha", 1).unwrap()).unwrap();
    server.insert(&client.insertion_request("beta", 1).unwrap()).unwrap();
    server.remove(&client.deletion_request("alpha", 1).unwrap()).unwrap();

    assert!(server.search(&client.search_request("alpha").unwrap()).unwrap().is_empty());
    assert_eq!(
        server.search(&client.search_request("beta").unwrap()).unwrap(),
        vec![1]
    );
}

#[test]
fn test_delete_before_insert_is_reported_not_fatal() {
    let mut client = JanusClient::new([0x15u8; 32]);
    let server = new_server();

    // more deletions than insertions: logged server-side, search still
    // returns the surviving multiset
    server.remove(&client.deletion_request("alpha", 1).unwrap()).unwrap();
    server.remove(&client.deletion_request("alpha", 2).unwrap()).unwrap();
    server.insert(&client.insertion_request("alpha", 3).unwrap()).unwrap();

    let results = server.search(&client.search_request("alpha").unwrap()).unwrap();
    assert_eq!(results, vec![3]);
}

#[test]
fn test_parallel_search_matches_sequential() {
    let mut client = JanusClient::new([0x16u8; 32]);
    let server = new_server();

    for index in 0..60u64 {
        server.insert(&client.insertion_request("alpha", index).unwrap()).unwrap();
    }
    for index in (0..60u64).step_by(3) {
        server.remove(&client.deletion_request("alpha", index).unwrap()).unwrap();
    }

    let req = client.search_request("alpha").unwrap();
    let mut sequential = server.search(&req).unwrap();
    sequential.sort_unstable();

    let expected: Vec<u64> = (0..60).filter(|i| i % 3 != 0).collect();
    assert_eq!(sequential, expected);

    for threads in [1usize, 2, 5, 16] {
        let mut parallel = server.search_parallel(&req, threads).unwrap();
        parallel.sort_unstable();
        assert_eq!(parallel, sequential, "threads_count = {}", threads);
    }
}

#[test]
fn test_reinsertion_after_deletion_stays_hidden() {
    // the tag binds (keyword, index): re-inserting the same pair after a
    // deletion produces a ciphertext under the already-punctured tag
    let mut client = JanusClient::new([0x17u8; 32]);
    let server = new_server();

    server.insert(&client.insertion_request("alpha", 5).unwrap()).unwrap();
    server.remove(&client.deletion_request("alpha", 5).unwrap()).unwrap();
    server.insert(&client.insertion_request("alpha", 5).unwrap()).unwrap();

    let results = server.search(&client.search_request("alpha").unwrap()).unwrap();
    assert!(results.is_empty());
}
