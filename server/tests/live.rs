//! CRUD lifecycle over real HTTP against a server bound to a random port.
//!
//! # Design
//! The server runs on its own thread with a current-thread runtime; the test
//! drives it with a blocking ureq agent so requests go through the full
//! listener, CORS and tracing stack.

use todo_core::TodoResource;
use todo_server::Config;

struct Response {
    status: u16,
    location: Option<String>,
    body: String,
}

struct Client {
    agent: ureq::Agent,
    base: String,
}

impl Client {
    fn new(base: String) -> Self {
        // 4xx/5xx come back as data so the test can assert on them.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent, base }
    }

    fn call(&self, method: &str, path: &str, body: Option<&str>) -> Response {
        let url = format!("{}{path}", self.base);
        let result = match (method, body) {
            ("GET", _) => self.agent.get(&url).call(),
            ("DELETE", _) => self.agent.delete(&url).call(),
            ("POST", Some(body)) => self
                .agent
                .post(&url)
                .content_type("application/json")
                .send(body.as_bytes()),
            ("PATCH", Some(body)) => self
                .agent
                .patch(&url)
                .content_type("application/json")
                .send(body.as_bytes()),
            ("PUT", Some(body)) => self
                .agent
                .put(&url)
                .content_type("application/json")
                .send(body.as_bytes()),
            other => panic!("unsupported request {other:?}"),
        };
        let mut response = result.expect("HTTP transport error");

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get("location")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.body_mut().read_to_string().unwrap_or_default();
        Response {
            status,
            location,
            body,
        }
    }

    fn json<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> (u16, T) {
        let response = self.call(method, path, body);
        (response.status, serde_json::from_str(&response.body).unwrap())
    }
}

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let config = Config {
        public_url: format!("http://{addr}"),
        ..Config::default()
    };

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            let app = todo_server::build(&config).await.unwrap();
            todo_server::run(listener, app, std::future::pending()).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

#[test]
fn crud_lifecycle() {
    let base = start_server();
    let client = Client::new(base.clone());

    // Empty to start with.
    let (status, todos): (_, Vec<TodoResource>) = client.json("GET", "/todos", None);
    assert_eq!(status, 200);
    assert!(todos.is_empty(), "expected empty list");

    // Create.
    let response = client.call("POST", "/todos", Some(r#"{"title":"Integration test"}"#));
    assert_eq!(response.status, 201);
    let created: TodoResource = serde_json::from_str(&response.body).unwrap();
    assert_eq!(created.title, "Integration test");
    assert!(!created.completed);
    assert_eq!(created.url, format!("{base}/todos/{}", created.id));
    assert_eq!(response.location.as_deref(), Some(created.url.as_str()));
    let path = format!("/todos/{}", created.id);

    // Read back.
    let (status, fetched): (_, TodoResource) = client.json("GET", &path, None);
    assert_eq!(status, 200);
    assert_eq!(fetched, created);

    // Partial update of the title.
    let (status, updated): (_, TodoResource) =
        client.json("PATCH", &path, Some(r#"{"title":"Updated title"}"#));
    assert_eq!(status, 200);
    assert_eq!(updated.title, "Updated title");
    assert!(!updated.completed);

    // PUT behaves the same way.
    let (status, updated): (_, TodoResource) =
        client.json("PUT", &path, Some(r#"{"completed":true,"order":2}"#));
    assert_eq!(status, 200);
    assert_eq!(updated.title, "Updated title");
    assert!(updated.completed);
    assert_eq!(updated.order, 2);

    let (_, todos): (_, Vec<TodoResource>) = client.json("GET", "/todos", None);
    assert_eq!(todos, vec![updated]);

    // Delete, then it is gone for good.
    let response = client.call("DELETE", &path, None);
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());

    assert_eq!(client.call("GET", &path, None).status, 404);
    assert_eq!(client.call("DELETE", &path, None).status, 404);

    // Clearing an empty collection still succeeds.
    assert_eq!(client.call("DELETE", "/todos", None).status, 204);
    let (_, todos): (_, Vec<TodoResource>) = client.json("GET", "/todos", None);
    assert!(todos.is_empty(), "expected empty list after delete");
}
