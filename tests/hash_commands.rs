use bytes::Bytes;
use dataplane::testing::MockServer;
use dataplane::{Cache, Client, Error};

fn client_for(server: &MockServer) -> Client {
    Client::open(&server.url()).expect("valid mock server url")
}

#[tokio::test]
async fn test_hset_and_hget() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    assert_eq!(client.hset("myhash", "field1", "value1").await.unwrap(), 1);
    assert_eq!(
        client.hget("myhash", "field1").await.unwrap(),
        Some(Bytes::from("value1"))
    );
    assert_eq!(client.hset("myhash", "field1", "value2").await.unwrap(), 0);
    assert_eq!(client.hget("myhash", "nope").await.unwrap(), None);
}

#[tokio::test]
async fn test_hset_stringifies_numbers() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client.hset("stats", "hits", &12).await.unwrap();
    client.hset("stats", "big", &9_000_000_000_i64).await.unwrap();
    client.hset("stats", "avg", &1.5).await.unwrap();

    assert_eq!(client.hget_int("stats", "hits").await.unwrap(), 12);
    assert_eq!(
        client.hget_int64("stats", "big").await.unwrap(),
        9_000_000_000
    );
    assert_eq!(client.hget_float64("stats", "avg").await.unwrap(), 1.5);
    assert_eq!(client.hget_string("stats", "hits").await.unwrap(), "12");
    assert!(matches!(
        client.hget_int("stats", "missing").await,
        Err(Error::Nil)
    ));
}

#[tokio::test]
async fn test_hmset_and_hmget_preserve_order() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client
        .hmset(
            "myhash2",
            &[
                ("field1", Bytes::from("value1")),
                ("field2", Bytes::from("value2")),
                ("field3", Bytes::from("value3")),
            ],
        )
        .await
        .unwrap();

    let values = client
        .hmget("myhash2", &["field3", "field4", "field1"])
        .await
        .unwrap();
    assert_eq!(
        values,
        vec![
            Some(Bytes::from("value3")),
            None,
            Some(Bytes::from("value1")),
        ]
    );
}

#[tokio::test]
async fn test_hmset_numbers_read_back_as_text() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client.hmset("k", &[("a", 1), ("b", 2)]).await.unwrap();
    let values = client.hmget("k", &["a", "b"]).await.unwrap();
    assert_eq!(values, vec![Some(Bytes::from("1")), Some(Bytes::from("2"))]);
}

#[tokio::test]
async fn test_hmset_empty_rejected() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let fields: [(&str, &str); 0] = [];
    assert!(matches!(
        client.hmset("h", &fields).await,
        Err(Error::InvalidArgument { .. })
    ));
    assert_eq!(server.total_commands(), 0);
}

#[tokio::test]
async fn test_hgetall() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client.hset("user", "name", "ann").await.unwrap();
    client.hset("user", "city", "oslo").await.unwrap();

    let all = client.hgetall("user").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all["name"], "ann");
    assert_eq!(all["city"], "oslo");
    assert!(client.hgetall("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hdel_and_hdels() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client
        .hmset("h", &[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")])
        .await
        .unwrap();

    assert_eq!(client.hdel("h", "a").await.unwrap(), 1);
    assert_eq!(client.hdel("h", "a").await.unwrap(), 0);
    assert_eq!(client.hdels("h", &["b", "c", "zz"]).await.unwrap(), 2);
    assert_eq!(client.hdels::<&str>("h", &[]).await.unwrap(), 0);
    assert_eq!(client.hgetall("h").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_hash_on_string_key_is_server_error() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client.set("plain", "v").await.unwrap();
    assert!(matches!(
        client.hget("plain", "f").await,
        Err(Error::Server { .. })
    ));
}

#[tokio::test]
#[ignore]
async fn test_hashes_against_live_server() {
    let client = Client::open("redis://127.0.0.1:6379").expect("valid url");

    client
        .hmset("dataplane:hash", &[("a", "1"), ("b", "2")])
        .await
        .unwrap();
    let values = client.hmget("dataplane:hash", &["b", "a"]).await.unwrap();
    assert_eq!(values, vec![Some(Bytes::from("2")), Some(Bytes::from("1"))]);
    client.del("dataplane:hash").await.unwrap();
}
