//! In-memory stand-in for the Etherpad HTTP API.
//!
//! Serves `GET /api/{version}/{method}` with Etherpad's
//! `{code, message, data}` envelope. Covers groups, authors, pad text and a
//! few pad properties; any other method answers `code: 3`. Faults can be
//! attached per method to delay the answer or replace it with a raw HTTP
//! error.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Key accepted by the binary when `ETHERPAD_API_KEY` is unset.
pub const DEV_API_KEY: &str = "6b95f6d270f4f719f1b70e8ad2f742deef94c5bccee7d495250c0fbb8cecefc7";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub code: i64,
    pub message: String,
    pub data: Value,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            code: 0,
            message: "ok".to_string(),
            data,
        }
    }

    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Value::Null,
        }
    }
}

/// Misbehaviour injected for one method.
#[derive(Clone, Debug)]
pub enum Fault {
    /// Sleep before answering normally.
    Delay(Duration),
    /// Answer with this status and a plain-text body instead of an envelope.
    Status(u16, String),
}

/// Builder for a mock server instance.
#[derive(Clone, Debug)]
pub struct MockEtherpad {
    api_key: String,
    faults: HashMap<String, Fault>,
}

impl MockEtherpad {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            faults: HashMap::new(),
        }
    }

    pub fn with_fault(mut self, method: impl Into<String>, fault: Fault) -> Self {
        self.faults.insert(method.into(), fault);
        self
    }

    pub fn into_router(self) -> Router {
        let shared = Arc::new(Shared {
            api_key: self.api_key,
            faults: self.faults,
            store: RwLock::new(Store::default()),
        });
        Router::new()
            .route("/api/{version}/{method}", get(api_call))
            .with_state(shared)
    }
}

pub fn app(api_key: &str) -> Router {
    MockEtherpad::new(api_key).into_router()
}

pub async fn run(listener: TcpListener, server: MockEtherpad) -> Result<(), std::io::Error> {
    axum::serve(listener, server.into_router()).await
}

struct Shared {
    api_key: String,
    faults: HashMap<String, Fault>,
    store: RwLock<Store>,
}

async fn api_call(
    State(shared): State<Arc<Shared>>,
    Path((version, method)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    tracing::debug!(%version, %method, "api call");

    match shared.faults.get(&method) {
        Some(Fault::Delay(delay)) => tokio::time::sleep(*delay).await,
        Some(Fault::Status(status, body)) => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, body.clone()).into_response();
        }
        None => {}
    }

    if params.get("apikey") != Some(&shared.api_key) {
        return Json(Envelope::error(4, "no or wrong API Key")).into_response();
    }

    let envelope = match shared.store.write().await.apply(&method, &params) {
        Ok(data) => Envelope::ok(data),
        Err(Failure(code, message)) => Envelope::error(code, message),
    };
    Json(envelope).into_response()
}

struct Failure(i64, String);

fn wrong(message: impl Into<String>) -> Failure {
    Failure(1, message.into())
}

type Params = HashMap<String, String>;

fn required<'a>(params: &'a Params, name: &str) -> Result<&'a str, Failure> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| wrong(format!("{name} is required")))
}

/// Random 16-character suffix in Etherpad's `g.`/`a.`/`s.` ID style.
fn short_id(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}.{}", &id[..16])
}

#[derive(Default)]
struct Pad {
    text: String,
    revisions: u64,
    public: bool,
}

#[derive(Default)]
struct Store {
    groups: BTreeSet<String>,
    group_mappers: HashMap<String, String>,
    authors: BTreeMap<String, Option<String>>,
    author_mappers: HashMap<String, String>,
    pads: BTreeMap<String, Pad>,
}

impl Store {
    fn apply(&mut self, method: &str, p: &Params) -> Result<Value, Failure> {
        match method {
            "createGroup" => Ok(json!({ "groupID": self.create_group() })),
            "createGroupIfNotExistsFor" => {
                let mapper = required(p, "groupMapper")?;
                let id = match self.group_mappers.get(mapper) {
                    Some(id) => id.clone(),
                    None => {
                        let id = self.create_group();
                        self.group_mappers.insert(mapper.to_string(), id.clone());
                        id
                    }
                };
                Ok(json!({ "groupID": id }))
            }
            "deleteGroup" => {
                let group = self.group(p)?.to_string();
                self.groups.remove(&group);
                self.group_mappers.retain(|_, id| *id != group);
                let prefix = format!("{group}$");
                self.pads.retain(|id, _| !id.starts_with(&prefix));
                Ok(Value::Null)
            }
            "listAllGroups" => Ok(json!({ "groupIDs": self.groups.iter().collect::<Vec<_>>() })),
            "listPads" => {
                let prefix = format!("{}$", self.group(p)?);
                let pads: Vec<_> = self.pads.keys().filter(|id| id.starts_with(&prefix)).collect();
                Ok(json!({ "padIDs": pads }))
            }
            "createGroupPad" => {
                let group = self.group(p)?;
                let id = format!("{group}${}", required(p, "padName")?);
                if self.pads.contains_key(&id) {
                    return Err(wrong("padName does already exist"));
                }
                self.insert_pad(id.clone(), p);
                Ok(json!({ "padID": id }))
            }

            "createAuthor" => {
                let id = short_id("a");
                self.authors.insert(id.clone(), p.get("name").cloned());
                Ok(json!({ "authorID": id }))
            }
            "createAuthorIfNotExistsFor" => {
                let mapper = required(p, "authorMapper")?;
                let id = self
                    .author_mappers
                    .entry(mapper.to_string())
                    .or_insert_with(|| short_id("a"))
                    .clone();
                let name = self.authors.entry(id.clone()).or_default();
                if let Some(new_name) = p.get("name") {
                    *name = Some(new_name.clone());
                }
                Ok(json!({ "authorID": id }))
            }
            "getAuthorName" => {
                let id = required(p, "authorID")?;
                let name = self.authors.get(id).ok_or_else(|| wrong("authorID does not exist"))?;
                Ok(json!(name))
            }

            "createPad" => {
                let id = required(p, "padID")?;
                if id.contains('$') {
                    return Err(wrong("createPad can't create group pads"));
                }
                if self.pads.contains_key(id) {
                    return Err(wrong("padID does already exist"));
                }
                self.insert_pad(id.to_string(), p);
                Ok(Value::Null)
            }
            "deletePad" => {
                let id = required(p, "padID")?;
                self.pads.remove(id).ok_or_else(|| wrong("padID does not exist"))?;
                Ok(Value::Null)
            }
            "getText" => Ok(json!({ "text": self.pad(p)?.text })),
            "setText" => {
                let text = required(p, "text")?.to_string();
                let pad = self.pad_mut(p)?;
                pad.text = text;
                pad.revisions += 1;
                Ok(Value::Null)
            }
            "appendText" => {
                let text = required(p, "text")?.to_string();
                let pad = self.pad_mut(p)?;
                pad.text.push_str(&text);
                pad.revisions += 1;
                Ok(Value::Null)
            }
            "getRevisionsCount" => Ok(json!({ "revisions": self.pad(p)?.revisions })),
            "getPublicStatus" => Ok(json!({ "publicStatus": self.pad(p)?.public })),
            "setPublicStatus" => {
                let public = match required(p, "publicStatus")? {
                    "true" => true,
                    "false" => false,
                    _ => return Err(wrong("publicStatus must be a boolean")),
                };
                self.pad_mut(p)?.public = public;
                Ok(Value::Null)
            }
            "listAllPads" => Ok(json!({ "padIDs": self.pads.keys().collect::<Vec<_>>() })),

            "checkToken" => Ok(Value::Null),
            "getStats" => Ok(json!({
                "totalPads": self.pads.len(),
                "totalSessions": 0,
                "totalActivePads": 0,
            })),
            _ => Err(Failure(3, "no such function".to_string())),
        }
    }

    fn create_group(&mut self) -> String {
        let id = short_id("g");
        self.groups.insert(id.clone());
        id
    }

    fn group<'a>(&self, p: &'a Params) -> Result<&'a str, Failure> {
        let id = required(p, "groupID")?;
        if !self.groups.contains(id) {
            return Err(wrong("groupID does not exist"));
        }
        Ok(id)
    }

    fn insert_pad(&mut self, id: String, p: &Params) {
        let pad = Pad {
            text: p.get("text").cloned().unwrap_or_default(),
            ..Pad::default()
        };
        self.pads.insert(id, pad);
    }

    fn pad(&self, p: &Params) -> Result<&Pad, Failure> {
        let id = required(p, "padID")?;
        self.pads.get(id).ok_or_else(|| wrong("padID does not exist"))
    }

    fn pad_mut(&mut self, p: &Params) -> Result<&mut Pad, Failure> {
        let id = required(p, "padID")?;
        self.pads.get_mut(id).ok_or_else(|| wrong("padID does not exist"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ok(store: &mut Store, method: &str, pairs: &[(&str, &str)]) -> Value {
        match store.apply(method, &params(pairs)) {
            Ok(data) => data,
            Err(Failure(code, message)) => panic!("{method} failed with {code}: {message}"),
        }
    }

    fn failure(store: &mut Store, method: &str, pairs: &[(&str, &str)]) -> (i64, String) {
        match store.apply(method, &params(pairs)) {
            Ok(data) => panic!("{method} unexpectedly returned {data}"),
            Err(Failure(code, message)) => (code, message),
        }
    }

    #[test]
    fn envelope_serializes_all_fields() {
        let json = serde_json::to_value(Envelope::error(1, "padID does not exist")).unwrap();
        assert_eq!(json, json!({"code": 1, "message": "padID does not exist", "data": null}));
    }

    #[test]
    fn short_ids_have_etherpad_shape() {
        let id = short_id("g");
        assert!(id.starts_with("g."));
        assert_eq!(id.len(), 18);
        assert_ne!(id, short_id("g"));
    }

    #[test]
    fn pad_text_lifecycle() {
        let mut store = Store::default();
        ok(&mut store, "createPad", &[("padID", "notes"), ("text", "a")]);
        ok(&mut store, "appendText", &[("padID", "notes"), ("text", "b")]);
        assert_eq!(ok(&mut store, "getText", &[("padID", "notes")]), json!({"text": "ab"}));
        assert_eq!(ok(&mut store, "getRevisionsCount", &[("padID", "notes")]), json!({"revisions": 1}));
        ok(&mut store, "setText", &[("padID", "notes"), ("text", "c")]);
        assert_eq!(ok(&mut store, "getText", &[("padID", "notes")]), json!({"text": "c"}));
    }

    #[test]
    fn duplicate_and_missing_pads() {
        let mut store = Store::default();
        ok(&mut store, "createPad", &[("padID", "notes")]);
        assert_eq!(
            failure(&mut store, "createPad", &[("padID", "notes")]),
            (1, "padID does already exist".to_string())
        );
        assert_eq!(
            failure(&mut store, "getText", &[("padID", "ghost")]),
            (1, "padID does not exist".to_string())
        );
        assert_eq!(
            failure(&mut store, "getText", &[]),
            (1, "padID is required".to_string())
        );
    }

    #[test]
    fn group_pads_are_namespaced_and_deleted_with_group() {
        let mut store = Store::default();
        let group = ok(&mut store, "createGroup", &[])["groupID"].as_str().unwrap().to_string();
        let pad = ok(&mut store, "createGroupPad", &[("groupID", group.as_str()), ("padName", "plan")]);
        assert_eq!(pad, json!({"padID": format!("{group}$plan")}));
        assert_eq!(
            ok(&mut store, "listPads", &[("groupID", group.as_str())]),
            json!({"padIDs": [format!("{group}$plan")]})
        );
        ok(&mut store, "deleteGroup", &[("groupID", group.as_str())]);
        assert_eq!(ok(&mut store, "listAllPads", &[]), json!({"padIDs": []}));
        assert_eq!(ok(&mut store, "listAllGroups", &[]), json!({"groupIDs": []}));
    }

    #[test]
    fn mappers_are_idempotent() {
        let mut store = Store::default();
        let first = ok(&mut store, "createGroupIfNotExistsFor", &[("groupMapper", "team")]);
        let second = ok(&mut store, "createGroupIfNotExistsFor", &[("groupMapper", "team")]);
        assert_eq!(first, second);

        let author = ok(&mut store, "createAuthorIfNotExistsFor", &[("authorMapper", "7"), ("name", "Ada")]);
        let again = ok(&mut store, "createAuthorIfNotExistsFor", &[("authorMapper", "7")]);
        assert_eq!(author, again);
        let id = author["authorID"].as_str().unwrap();
        assert_eq!(ok(&mut store, "getAuthorName", &[("authorID", id)]), json!("Ada"));
    }

    #[test]
    fn unknown_method_is_code_3() {
        let mut store = Store::default();
        assert_eq!(failure(&mut store, "dropDatabase", &[]), (3, "no such function".to_string()));
    }
}
