use bytes::Bytes;
use dataplane::testing::MockServer;
use dataplane::{Cache, Client, Cmd};

fn client_for(server: &MockServer) -> Client {
    Client::open(&server.url()).expect("valid mock server url")
}

#[tokio::test]
async fn test_rpop_returns_tail() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let push = Cmd::new("RPUSH").arg("queue").args(&["a", "b", "c"]).unwrap();
    client.execute_batch_last_reply_only(&[push]).await.unwrap();

    assert_eq!(client.rpop("queue").await.unwrap(), Some(Bytes::from("c")));
    assert_eq!(client.rpop("queue").await.unwrap(), Some(Bytes::from("b")));
    assert_eq!(client.rpop("queue").await.unwrap(), Some(Bytes::from("a")));
    assert_eq!(client.rpop("queue").await.unwrap(), None);
}

#[tokio::test]
async fn test_rpop_missing_key() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    assert_eq!(client.rpop("nothing").await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn test_lists_against_live_server() {
    let client = Client::open("redis://127.0.0.1:6379").expect("valid url");

    let push = Cmd::new("RPUSH").arg("dataplane:list").arg("x");
    client.execute_batch_last_reply_only(&[push]).await.unwrap();
    assert_eq!(
        client.rpop("dataplane:list").await.unwrap(),
        Some(Bytes::from("x"))
    );
}
