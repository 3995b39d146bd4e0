use dataplane::testing::MockServer;
use dataplane::{Cache, Client};

fn client_for(server: &MockServer) -> Client {
    Client::open(&server.url()).expect("valid mock server url")
}

#[tokio::test]
async fn test_sadd_single_and_many() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    assert_eq!(client.sadd("tags", "rust").await.unwrap(), 1);
    assert_eq!(client.sadd("tags", &["go", "rust", "zig"]).await.unwrap(), 2);
    assert_eq!(
        client.smembers("tags").await.unwrap(),
        vec!["go", "rust", "zig"]
    );
}

#[tokio::test]
async fn test_srem_and_sismember() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client.sadd("s", &vec!["a", "b", "c"]).await.unwrap();
    assert!(client.sismember("s", "b").await.unwrap());
    assert_eq!(client.srem("s", &["b", "x"]).await.unwrap(), 1);
    assert!(!client.sismember("s", "b").await.unwrap());
    assert_eq!(client.srem("s", "a").await.unwrap(), 1);
}

#[tokio::test]
async fn test_numeric_members_are_flattened() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client.sadd("ids", &[3, 1, 2]).await.unwrap();
    assert!(client.sismember("ids", &2).await.unwrap());
    assert_eq!(client.smembers("ids").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_smembers_large_reply() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let members: Vec<String> = (0..50_000).map(|i| format!("member:{i:05}")).collect();
    assert_eq!(client.sadd("big", &members).await.unwrap(), 50_000);

    let mut got = client.smembers("big").await.unwrap();
    got.sort();
    assert_eq!(got, members);
}

#[tokio::test]
async fn test_set_algebra() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client.sadd("a", &["1", "2", "3"]).await.unwrap();
    client.sadd("b", &["2", "3", "4"]).await.unwrap();

    assert_eq!(client.sinter(&["a", "b"]).await.unwrap(), vec!["2", "3"]);
    assert_eq!(
        client.sunion(&["a", "b"]).await.unwrap(),
        vec!["1", "2", "3", "4"]
    );
    assert_eq!(client.sdiff(&["a", "b"]).await.unwrap(), vec!["1"]);
    assert!(client.sinter(&["a", "empty"]).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_sets_against_live_server() {
    let client = Client::open("redis://127.0.0.1:6379").expect("valid url");

    client.sadd("dataplane:set", &["x", "y"]).await.unwrap();
    assert!(client.sismember("dataplane:set", "x").await.unwrap());
    client.del("dataplane:set").await.unwrap();
}
