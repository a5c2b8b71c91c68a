//! Catalog of the Etherpad HTTP API methods this client can call.
//!
//! # Design
//! The catalog is a closed enum plus a static descriptor table generated from
//! one declaration list, so a method cannot exist without a wire name, a
//! minimum protocol version, and a parameter list. Parameter lists are
//! informational: the client logs missing required parameters but lets
//! Etherpad reject the call.
//!
//! Reference: <https://etherpad.org/doc/v1.8.18/#index_http_api>

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::version::ApiVersion;

/// One query parameter accepted by a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub optional: bool,
}

const fn req(name: &'static str) -> Param {
    Param {
        name,
        optional: false,
    }
}

const fn opt(name: &'static str) -> Param {
    Param {
        name,
        optional: true,
    }
}

/// Static description of one remote method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub method: Method,
    /// Name used in the URL path, e.g. `listAllPads`.
    pub name: &'static str,
    pub min_version: ApiVersion,
    pub params: &'static [Param],
}

impl MethodDescriptor {
    /// Names of the required parameters absent from `provided`.
    pub fn missing_params<'a, I>(&self, provided: I) -> Vec<&'static str>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        self.params
            .iter()
            .filter(|p| !p.optional)
            .filter(|p| !provided.clone().into_iter().any(|name| name == p.name))
            .map(|p| p.name)
            .collect()
    }
}

macro_rules! registry {
    ($( $variant:ident => $name:literal, ($major:literal, $minor:literal, $patch:literal), [$($param:expr),* $(,)?]; )*) => {
        /// Every remote method known to the client.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Method {
            $($variant,)*
        }

        /// Descriptor table, in declaration order.
        pub static METHODS: &[MethodDescriptor] = &[
            $(MethodDescriptor {
                method: Method::$variant,
                name: $name,
                min_version: ApiVersion::new($major, $minor, $patch),
                params: &[$($param),*],
            },)*
        ];

        impl Method {
            pub const ALL: &'static [Method] = &[$(Method::$variant,)*];

            pub fn name(&self) -> &'static str {
                match self {
                    $(Method::$variant => $name,)*
                }
            }
        }
    };
}

registry! {
    // Groups
    CreateGroup => "createGroup", (1, 0, 0), [];
    CreateGroupIfNotExistsFor => "createGroupIfNotExistsFor", (1, 0, 0), [req("groupMapper")];
    DeleteGroup => "deleteGroup", (1, 0, 0), [req("groupID")];
    ListPads => "listPads", (1, 0, 0), [req("groupID")];
    CreateGroupPad => "createGroupPad", (1, 0, 0), [req("groupID"), req("padName"), opt("text")];
    ListAllGroups => "listAllGroups", (1, 1, 0), [];

    // Authors
    CreateAuthor => "createAuthor", (1, 0, 0), [opt("name")];
    CreateAuthorIfNotExistsFor => "createAuthorIfNotExistsFor", (1, 0, 0), [req("authorMapper"), opt("name")];
    ListPadsOfAuthor => "listPadsOfAuthor", (1, 0, 0), [req("authorID")];
    GetAuthorName => "getAuthorName", (1, 1, 0), [req("authorID")];

    // Sessions
    CreateSession => "createSession", (1, 0, 0), [req("groupID"), req("authorID"), req("validUntil")];
    DeleteSession => "deleteSession", (1, 0, 0), [req("sessionID")];
    GetSessionInfo => "getSessionInfo", (1, 0, 0), [req("sessionID")];
    ListSessionsOfGroup => "listSessionsOfGroup", (1, 0, 0), [req("groupID")];
    ListSessionsOfAuthor => "listSessionsOfAuthor", (1, 0, 0), [req("authorID")];

    // Pad content
    GetText => "getText", (1, 0, 0), [req("padID"), opt("rev")];
    SetText => "setText", (1, 0, 0), [req("padID"), req("text")];
    AppendText => "appendText", (1, 2, 13), [req("padID"), req("text")];
    GetHtml => "getHTML", (1, 0, 0), [req("padID"), opt("rev")];
    SetHtml => "setHTML", (1, 0, 0), [req("padID"), req("html")];
    GetAttributePool => "getAttributePool", (1, 2, 8), [req("padID")];
    GetRevisionChangeset => "getRevisionChangeset", (1, 2, 8), [req("padID"), opt("rev")];
    CreateDiffHtml => "createDiffHTML", (1, 2, 7), [req("padID"), req("startRev"), req("endRev")];
    RestoreRevision => "restoreRevision", (1, 2, 11), [req("padID"), req("rev")];

    // Chat
    GetChatHistory => "getChatHistory", (1, 2, 7), [req("padID"), opt("start"), opt("end")];
    GetChatHead => "getChatHead", (1, 2, 7), [req("padID")];
    AppendChatMessage => "appendChatMessage", (1, 2, 12), [req("padID"), req("text"), req("authorID"), opt("time")];

    // Pads
    CreatePad => "createPad", (1, 0, 0), [req("padID"), opt("text")];
    GetRevisionsCount => "getRevisionsCount", (1, 0, 0), [req("padID")];
    GetSavedRevisionsCount => "getSavedRevisionsCount", (1, 2, 11), [req("padID")];
    ListSavedRevisions => "listSavedRevisions", (1, 2, 11), [req("padID")];
    SaveRevision => "saveRevision", (1, 2, 11), [req("padID"), opt("rev")];
    PadUsersCount => "padUsersCount", (1, 0, 0), [req("padID")];
    PadUsers => "padUsers", (1, 1, 0), [req("padID")];
    DeletePad => "deletePad", (1, 0, 0), [req("padID")];
    CopyPad => "copyPad", (1, 2, 8), [req("sourceID"), req("destinationID"), opt("force")];
    CopyPadWithoutHistory => "copyPadWithoutHistory", (1, 2, 15), [req("sourceID"), req("destinationID"), opt("force")];
    MovePad => "movePad", (1, 2, 8), [req("sourceID"), req("destinationID"), opt("force")];
    GetReadOnlyId => "getReadOnlyID", (1, 0, 0), [req("padID")];
    GetPadId => "getPadID", (1, 2, 10), [req("readOnlyID")];
    SetPublicStatus => "setPublicStatus", (1, 0, 0), [req("padID"), req("publicStatus")];
    GetPublicStatus => "getPublicStatus", (1, 0, 0), [req("padID")];
    SetPassword => "setPassword", (1, 0, 0), [req("padID"), req("password")];
    IsPasswordProtected => "isPasswordProtected", (1, 0, 0), [req("padID")];
    ListAuthorsOfPad => "listAuthorsOfPad", (1, 0, 0), [req("padID")];
    GetLastEdited => "getLastEdited", (1, 0, 0), [req("padID")];
    SendClientsMessage => "sendClientsMessage", (1, 1, 0), [req("padID"), req("msg")];
    CheckToken => "checkToken", (1, 2, 0), [];
    ListAllPads => "listAllPads", (1, 2, 1), [];

    // Global
    GetStats => "getStats", (1, 2, 14), [];
}

static BY_NAME: LazyLock<HashMap<&'static str, &'static MethodDescriptor>> =
    LazyLock::new(|| METHODS.iter().map(|d| (d.name, d)).collect());

impl Method {
    /// Look a method up by its wire name (case-sensitive).
    pub fn from_name(name: &str) -> Option<Method> {
        BY_NAME.get(name).map(|d| d.method)
    }

    pub fn descriptor(&self) -> &'static MethodDescriptor {
        // `METHODS` is declared in variant order.
        &METHODS[*self as usize]
    }

    pub fn min_version(&self) -> ApiVersion {
        self.descriptor().min_version
    }

    pub fn params(&self) -> &'static [Param] {
        self.descriptor().params
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
