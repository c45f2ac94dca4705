//! View composition over the five executors.
//!
//! # Design
//! The board owns one executor per verb, all sharing a transport, and one
//! [`BusyMap`] for the row actions. The listed posts come straight from the
//! GET result and are never rewritten by later writes; PUT, PATCH and
//! DELETE outcomes only show up in the results section.

use std::fmt;
use std::sync::Arc;

use posts_core::{
    Action, BusyMap, BusyState, ExecutorState, PostsApi, RequestExecutor, Transport,
};
use serde_json::Value;
use tokio::sync::watch;

/// How many listed posts the board shows.
pub const VISIBLE_POSTS: usize = 11;

const DELETED_MESSAGE: &str = "Post deleted successfully";

pub struct PostsBoard<T> {
    api: PostsApi,
    list: RequestExecutor<T>,
    create: RequestExecutor<T>,
    replace: RequestExecutor<T>,
    patch: RequestExecutor<T>,
    delete: RequestExecutor<T>,
    busy: BusyMap,
}

impl<T> Clone for PostsBoard<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            list: self.list.clone(),
            create: self.create.clone(),
            replace: self.replace.clone(),
            patch: self.patch.clone(),
            delete: self.delete.clone(),
            busy: self.busy.clone(),
        }
    }
}

/// A listed post as the board shows it, with its row's busy flags.
///
/// `id` is the item's `id` field as listed (`Null` when absent). Rows whose
/// id is not an unsigned integer are still shown but can never be busy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: Value,
    pub title: String,
    pub body: String,
    pub put_busy: bool,
    pub patch_busy: bool,
    pub delete_busy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLine {
    pub label: &'static str,
    pub text: String,
}

/// Everything a front end needs to draw the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub posts: Vec<PostRow>,
    pub loading: bool,
    /// `"<VERB> Error: <message>"`, POST and GET first, then PUT, PATCH, DELETE.
    pub alerts: Vec<String>,
    pub results: Vec<ResultLine>,
}

impl PostRow {
    /// The id as the board's actions address it, if it is one.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_u64()
    }
}

impl<T: Transport> PostsBoard<T> {
    pub fn new(api: PostsApi, transport: Arc<T>) -> Self {
        Self {
            api,
            list: RequestExecutor::get(Arc::clone(&transport)),
            create: RequestExecutor::post(Arc::clone(&transport)),
            replace: RequestExecutor::put(Arc::clone(&transport)),
            patch: RequestExecutor::patch(Arc::clone(&transport)),
            delete: RequestExecutor::delete(transport),
            busy: BusyMap::new(),
        }
    }

    pub fn api(&self) -> &PostsApi {
        &self.api
    }

    pub fn busy(&self) -> &BusyMap {
        &self.busy
    }

    /// Fetch the post list.
    pub async fn load(&self) -> Option<Value> {
        self.list.execute(&self.api.posts_url(), None).await
    }

    /// Create the demo post. Not tracked per row.
    pub async fn create(&self) -> Option<Value> {
        self.create
            .execute_json(&self.api.posts_url(), &self.api.new_post())
            .await
    }

    pub async fn replace(&self, id: u64) -> Option<Value> {
        let url = self.api.post_url(id);
        let payload = self.api.replacement(id);
        let (url, payload) = (&url, &payload);
        self.busy
            .run_tracked(Action::Put, id, move || self.replace.execute_json(url, payload))
            .await
    }

    pub async fn patch(&self, id: u64) -> Option<Value> {
        let url = self.api.post_url(id);
        let payload = self.api.patch();
        let (url, payload) = (&url, &payload);
        self.busy
            .run_tracked(Action::Patch, id, move || self.patch.execute_json(url, payload))
            .await
    }

    pub async fn delete(&self, id: u64) -> Option<Value> {
        let url = self.api.post_url(id);
        let url = &url;
        self.busy
            .run_tracked(Action::Delete, id, move || self.delete.execute(url, None))
            .await
    }

    /// Receivers for every executor and the busy map.
    pub fn subscribe(&self) -> BoardChanges {
        BoardChanges {
            list: self.list.subscribe(),
            create: self.create.subscribe(),
            replace: self.replace.subscribe(),
            patch: self.patch.subscribe(),
            delete: self.delete.subscribe(),
            busy: self.busy.subscribe(),
        }
    }

    pub fn view(&self) -> BoardView {
        let list = self.list.snapshot();
        let create = self.create.snapshot();
        let replace = self.replace.snapshot();
        let patch = self.patch.snapshot();
        let delete = self.delete.snapshot();
        let busy = self.busy.snapshot();

        let alerts: Vec<String> = [
            ("POST", &create),
            ("GET", &list),
            ("PUT", &replace),
            ("PATCH", &patch),
            ("DELETE", &delete),
        ]
        .into_iter()
        .filter_map(|(verb, state)| {
            state
                .error
                .as_ref()
                .map(|message| format!("{verb} Error: {message}"))
        })
        .collect();

        let mut results = Vec::new();
        for (label, state) in [
            ("Created Post", &create),
            ("Updated Post", &replace),
            ("Patched Post", &patch),
        ] {
            if let Some(value) = state.result.as_ref().filter(|v| is_shown(v)) {
                results.push(ResultLine {
                    label,
                    text: describe(value),
                });
            }
        }
        if delete.result.as_ref().is_some_and(is_shown) {
            results.push(ResultLine {
                label: "Deleted Post",
                text: DELETED_MESSAGE.to_string(),
            });
        }

        BoardView {
            posts: rows(&list, &busy),
            loading: list.in_flight,
            alerts,
            results,
        }
    }

    /// Plain-text rendering of [`view`](Self::view).
    pub fn render(&self) -> String {
        self.view().to_string()
    }
}

impl fmt::Display for BoardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blog Posts Manager")?;
        writeln!(f)?;
        writeln!(f, "Posts")?;
        for alert in self.alerts.iter().filter(|a| is_list_alert(a)) {
            writeln!(f, "! {alert}")?;
        }
        if self.loading {
            writeln!(f, "Loading posts...")?;
        }
        for row in &self.posts {
            writeln!(f, "#{} {}", display_id(&row.id), row.title)?;
            writeln!(f, "    {}", row.body.replace('\n', " "))?;
            writeln!(
                f,
                "    {} {} {}",
                button("PUT", row.put_busy),
                button("PATCH", row.patch_busy),
                button("DELETE", row.delete_busy),
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Results")?;
        for line in &self.results {
            writeln!(f, "{}: {}", line.label, line.text)?;
        }
        for alert in self.alerts.iter().filter(|a| !is_list_alert(a)) {
            writeln!(f, "! {alert}")?;
        }
        Ok(())
    }
}

/// Watches every piece of board state.
pub struct BoardChanges {
    list: watch::Receiver<ExecutorState>,
    create: watch::Receiver<ExecutorState>,
    replace: watch::Receiver<ExecutorState>,
    patch: watch::Receiver<ExecutorState>,
    delete: watch::Receiver<ExecutorState>,
    busy: watch::Receiver<BusyState>,
}

impl BoardChanges {
    /// Wait until any part of the board changes. Returns `false` once the
    /// board has been dropped.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            r = self.list.changed() => r.is_ok(),
            r = self.create.changed() => r.is_ok(),
            r = self.replace.changed() => r.is_ok(),
            r = self.patch.changed() => r.is_ok(),
            r = self.delete.changed() => r.is_ok(),
            r = self.busy.changed() => r.is_ok(),
        }
    }
}

fn rows(list: &ExecutorState, busy: &BusyState) -> Vec<PostRow> {
    let Some(items) = list.result.as_ref().and_then(Value::as_array) else {
        return Vec::new();
    };
    let flag = |action: Action, id: Option<u64>| {
        id.and_then(|id| busy.get(&action)?.get(&id).copied())
            .unwrap_or(false)
    };

    items
        .iter()
        .take(VISIBLE_POSTS)
        .map(|item| {
            let id = item.get("id").cloned().unwrap_or(Value::Null);
            let numeric = id.as_u64();
            let text = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            PostRow {
                id,
                title: text("title"),
                body: text("body"),
                put_busy: flag(Action::Put, numeric),
                patch_busy: flag(Action::Patch, numeric),
                delete_busy: flag(Action::Delete, numeric),
            }
        })
        .collect()
}

/// Results that are `null`, `false`, `0` or `""` are not shown.
fn is_shown(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A result's `message` field if it has one, its JSON otherwise.
fn describe(value: &Value) -> String {
    match value.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => value.to_string(),
    }
}

fn is_list_alert(alert: &str) -> bool {
    alert.starts_with("POST ") || alert.starts_with("GET ")
}

fn button(label: &str, busy: bool) -> String {
    if busy {
        format!("[{label} ...]")
    } else {
        format!("[{label}]")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use posts_core::{FetchError, HttpMethod, HttpRequest, HttpResponse};
    use serde_json::json;
    use tokio::sync::oneshot;

    use super::*;

    const BASE: &str = "http://api.test";

    type Reply = Result<HttpResponse, FetchError>;

    /// Scripted service: replies are queued per `(method, url)` and may be
    /// released later by the test.
    #[derive(Default)]
    struct FakeService {
        replies: Mutex<HashMap<(HttpMethod, String), VecDeque<oneshot::Receiver<Reply>>>>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl FakeService {
        fn gate(&self, method: HttpMethod, path: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.replies
                .lock()
                .unwrap()
                .entry((method, format!("{BASE}{path}")))
                .or_default()
                .push_back(rx);
            tx
        }

        fn reply(&self, method: HttpMethod, path: &str, reply: Reply) {
            self.gate(method, path).send(reply).unwrap();
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeService {
        async fn send(&self, request: HttpRequest) -> Reply {
            let key = (request.method, request.url.clone());
            let queued = self
                .replies
                .lock()
                .unwrap()
                .get_mut(&key)
                .and_then(VecDeque::pop_front);
            self.sent.lock().unwrap().push(request);
            match queued {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(FetchError::Transport("reply dropped".to_string()))),
                None => Err(FetchError::Transport("no reply scripted".to_string())),
            }
        }
    }

    fn ok(status: u16, body: Value) -> Reply {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    fn posts(count: u64) -> Value {
        Value::Array(
            (1..=count)
                .map(|id| json!({"id": id, "title": format!("t{id}"), "body": format!("b{id}"), "userId": 1}))
                .collect(),
        )
    }

    fn board() -> (Arc<FakeService>, PostsBoard<FakeService>) {
        let service = Arc::new(FakeService::default());
        let board = PostsBoard::new(PostsApi::new(BASE), Arc::clone(&service));
        (service, board)
    }

    async fn loaded(count: u64) -> (Arc<FakeService>, PostsBoard<FakeService>) {
        let (service, board) = board();
        service.reply(HttpMethod::Get, "/posts", ok(200, posts(count)));
        board.load().await;
        (service, board)
    }

    #[tokio::test]
    async fn list_shows_first_eleven_posts() {
        let (service, board) = board();
        let gate = service.gate(HttpMethod::Get, "/posts");

        let task = {
            let board = board.clone();
            tokio::spawn(async move { board.load().await })
        };
        let mut changes = board.subscribe();
        while !board.view().loading {
            changes.changed().await;
        }
        assert!(board.render().contains("Loading posts..."));
        assert!(board.view().posts.is_empty());

        gate.send(ok(200, posts(20))).unwrap();
        task.await.unwrap();

        let view = board.view();
        assert!(!view.loading);
        assert_eq!(view.posts.len(), VISIBLE_POSTS);
        assert_eq!(view.posts[0].id, json!(1));
        assert_eq!(view.posts[10].numeric_id(), Some(11));
        assert!(view.alerts.is_empty());
        assert!(!board.render().contains("Loading posts..."));
    }

    #[tokio::test]
    async fn create_posts_fixed_payload_and_shows_result() {
        let (service, board) = loaded(20).await;
        let echoed = json!({"id": 101, "title": "New Post", "body": "Content...", "userId": 101});
        service.reply(HttpMethod::Post, "/posts", ok(201, echoed.clone()));

        let returned = board.create().await;

        let posts_sent: Vec<_> = service
            .sent()
            .into_iter()
            .filter(|r| r.method == HttpMethod::Post)
            .collect();
        assert_eq!(posts_sent.len(), 1);
        assert_eq!(posts_sent[0].url, format!("{BASE}/posts"));
        let body: Value = serde_json::from_str(posts_sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"title": "New Post", "body": "Content...", "userId": 101})
        );

        assert_eq!(returned, Some(echoed.clone()));
        let view = board.view();
        assert_eq!(
            view.results,
            vec![ResultLine {
                label: "Created Post",
                text: echoed.to_string(),
            }]
        );
        assert_eq!(view.posts.len(), VISIBLE_POSTS);
        assert!(board.render().contains("Created Post: "));
    }

    #[tokio::test]
    async fn failed_delete_reports_error_and_keeps_list() {
        let (service, board) = loaded(20).await;
        let before = board.view().posts;
        service.reply(
            HttpMethod::Delete,
            "/posts/5",
            Err(FetchError::Transport("Network down".to_string())),
        );

        assert!(board.delete(5).await.is_none());

        let view = board.view();
        assert!(!board.busy().is_busy(Action::Delete, 5));
        assert_eq!(
            board.busy().snapshot()[&Action::Delete].get(&5),
            Some(&false)
        );
        assert_eq!(view.alerts, vec!["DELETE Error: Network down".to_string()]);
        assert_eq!(view.posts, before);
        assert!(view.results.is_empty());
    }

    #[tokio::test]
    async fn row_is_busy_only_during_its_own_action() {
        let (service, board) = loaded(3).await;
        let gate = service.gate(HttpMethod::Put, "/posts/2");

        let task = {
            let board = board.clone();
            tokio::spawn(async move { board.replace(2).await })
        };
        let mut changes = board.subscribe();
        while !board.busy().is_busy(Action::Put, 2) {
            changes.changed().await;
        }

        let rows = board.view().posts;
        assert!(rows[1].put_busy);
        assert!(!rows[1].patch_busy);
        assert!(!rows[0].put_busy);
        assert!(board.render().contains("[PUT ...]"));

        gate.send(ok(200, json!({"id": 2, "title": "Updated"}))).unwrap();
        task.await.unwrap();
        assert!(!board.view().posts[1].put_busy);
    }

    #[tokio::test]
    async fn writes_fill_results_without_touching_list() {
        let (service, board) = loaded(3).await;
        service.reply(
            HttpMethod::Put,
            "/posts/1",
            ok(200, json!({"id": 1, "title": "Updated", "body": "Updated content", "userId": 1})),
        );
        service.reply(
            HttpMethod::Patch,
            "/posts/1",
            ok(200, json!({"id": 1, "title": "Patched Title"})),
        );
        service.reply(HttpMethod::Delete, "/posts/1", ok(200, json!({})));

        board.replace(1).await;
        board.patch(1).await;
        board.delete(1).await;

        let view = board.view();
        let labels: Vec<_> = view.results.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["Updated Post", "Patched Post", "Deleted Post"]);
        assert_eq!(view.results[2].text, "Post deleted successfully");
        assert_eq!(view.posts[0].title, "t1");

        let sent = service.sent();
        let patch = sent.iter().find(|r| r.method == HttpMethod::Patch).unwrap();
        assert_eq!(patch.body.as_deref(), Some(r#"{"title":"Patched Title"}"#));
        let delete = sent.iter().find(|r| r.method == HttpMethod::Delete).unwrap();
        assert!(delete.body.is_none());
    }

    #[tokio::test]
    async fn list_failure_is_alerted_above_posts() {
        let (service, board) = board();
        service.reply(HttpMethod::Get, "/posts", ok(503, json!("down")));

        board.load().await;

        let view = board.view();
        assert!(view.posts.is_empty());
        assert_eq!(view.alerts, vec!["GET Error: HTTP error! status: 503".to_string()]);
        let rendered = board.render();
        let alert = rendered.find("GET Error").unwrap();
        assert!(alert < rendered.find("Results").unwrap());
    }

    #[tokio::test]
    async fn alerts_follow_board_order() {
        let (service, board) = board();
        service.reply(HttpMethod::Get, "/posts", ok(500, json!(null)));
        service.reply(HttpMethod::Post, "/posts", ok(500, json!(null)));
        service.reply(HttpMethod::Patch, "/posts/1", ok(500, json!(null)));

        board.load().await;
        board.create().await;
        board.patch(1).await;

        let verbs: Vec<_> = board
            .view()
            .alerts
            .iter()
            .map(|a| a.split(' ').next().unwrap().to_string())
            .collect();
        assert_eq!(verbs, vec!["POST", "GET", "PATCH"]);
    }

    #[tokio::test]
    async fn null_results_are_not_shown() {
        let (service, board) = loaded(3).await;
        service.reply(HttpMethod::Put, "/posts/1", ok(200, Value::Null));
        service.reply(HttpMethod::Delete, "/posts/1", ok(200, Value::Null));

        board.replace(1).await;
        board.delete(1).await;

        let view = board.view();
        assert!(view.results.is_empty(), "{:?}", view.results);
        assert!(view.alerts.is_empty());
        let rendered = board.render();
        assert!(!rendered.contains("Updated Post"));
        assert!(!rendered.contains("Deleted Post"));
    }

    #[tokio::test]
    async fn items_without_numeric_ids_are_still_listed() {
        let (service, board) = board();
        service.reply(
            HttpMethod::Get,
            "/posts",
            ok(200, json!([{"id": "a", "title": "t"}, {"id": 2, "title": "u"}, {"title": "v"}])),
        );
        let gate = service.gate(HttpMethod::Delete, "/posts/2");

        board.load().await;
        let task = {
            let board = board.clone();
            tokio::spawn(async move { board.delete(2).await })
        };
        let mut changes = board.subscribe();
        while !board.busy().is_busy(Action::Delete, 2) {
            changes.changed().await;
        }

        let view = board.view();
        let ids: Vec<_> = view.posts.iter().map(|row| row.id.clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!(2), Value::Null]);
        assert!(!view.posts[0].delete_busy);
        assert!(view.posts[1].delete_busy);
        assert_eq!(view.posts[0].numeric_id(), None);
        let rendered = board.render();
        assert!(rendered.contains("#a t"));
        assert!(rendered.contains("#2 u"));

        gate.send(ok(200, json!({}))).unwrap();
        task.await.unwrap();
    }

    #[test]
    fn board_view_displays_sections_in_order() {
        let view = BoardView {
            posts: vec![PostRow {
                id: json!(7),
                title: "seven".to_string(),
                body: "line one\nline two".to_string(),
                put_busy: false,
                patch_busy: true,
                delete_busy: false,
            }],
            loading: false,
            alerts: vec![
                "GET Error: HTTP error! status: 500".to_string(),
                "PUT Error: Network down".to_string(),
            ],
            results: vec![ResultLine {
                label: "Created Post",
                text: r#"{"id":101}"#.to_string(),
            }],
        };

        let expected = "Blog Posts Manager\n\nPosts\n\
            ! GET Error: HTTP error! status: 500\n\
            #7 seven\n    line one line two\n    [PUT] [PATCH ...] [DELETE]\n\
            \nResults\nCreated Post: {\"id\":101}\n\
            ! PUT Error: Network down\n";
        assert_eq!(view.to_string(), expected);
    }

    #[test]
    fn falsy_results_are_hidden() {
        assert!(!is_shown(&Value::Null));
        assert!(!is_shown(&json!(false)));
        assert!(!is_shown(&json!(0)));
        assert!(!is_shown(&json!("")));
        assert!(is_shown(&json!({})));
        assert!(is_shown(&json!([])));
        assert!(is_shown(&json!(1)));
    }

    #[test]
    fn describe_prefers_message_field() {
        assert_eq!(describe(&json!({"message": "hi", "id": 1})), "hi");
        assert_eq!(describe(&json!({"id": 1})), r#"{"id":1}"#);
    }
}
