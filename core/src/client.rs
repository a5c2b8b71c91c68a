//! Typed entry point for the Etherpad HTTP API.
//!
//! # Design
//! `EtherpadClient` holds a validated `Configuration` and a `Dispatcher`
//! built from it once; nothing mutates after construction, so a client can be
//! cloned and shared across tasks freely. Every operation checks the method's
//! minimum protocol version before any I/O, then hands off to the dispatcher.
//!
//! Operations take any `Serialize` value as parameters (`json!({...})`, a
//! struct, or `&()` for none) and resolve with the envelope's `data` as a
//! `serde_json::Value`.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::{self, Configuration};
use crate::dispatch::{Dispatcher, OnRemoteError};
use crate::error::{ApiError, ConfigError};
use crate::methods::Method;
use crate::transport::{ReqwestTransport, Transport};
use crate::version;

/// Client bound to one Etherpad instance.
#[derive(Debug, Clone)]
pub struct EtherpadClient {
    config: Configuration,
    dispatcher: Dispatcher,
}

impl EtherpadClient {
    /// Client using the default reqwest transport.
    pub fn new(config: Configuration) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: Configuration,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let api_root = config.api_root()?;
        let dispatcher = Dispatcher::new(api_root, config.api_key(), config.timeout(), transport);
        Ok(Self { config, dispatcher })
    }

    /// Validate raw settings and build a client from them.
    pub fn connect(raw: &Value) -> Result<Self, ConfigError> {
        Self::new(config::validate(raw)?)
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Versioned root every call is issued against.
    pub fn api_root(&self) -> &url::Url {
        self.dispatcher.api_root()
    }

    /// Call `method` with `params`.
    ///
    /// Fails with [`ApiError::NotImplemented`] without touching the network
    /// when the configured API version predates the method.
    #[tracing::instrument(name = "etherpad", skip_all, fields(method = %method))]
    pub async fn call<P: Serialize + ?Sized>(
        &self,
        method: Method,
        params: &P,
        on_error: OnRemoteError,
    ) -> Result<Value, ApiError> {
        version::ensure_supported(self.config.api_version(), method.min_version())?;
        self.dispatcher.call(method, params, on_error).await
    }
}

macro_rules! operations {
    ($( $(#[$attr:meta])* $fn_name:ident => $method:ident; )*) => {
        impl EtherpadClient {
            $(
                $(#[$attr])*
                pub async fn $fn_name<P: Serialize + ?Sized>(
                    &self,
                    params: &P,
                    on_error: OnRemoteError,
                ) -> Result<Value, ApiError> {
                    self.call(Method::$method, params, on_error).await
                }
            )*
        }
    };
}

operations! {
    // Groups
    /// Returns `{groupID}`.
    create_group => CreateGroup;
    /// Params: `groupMapper`. Returns `{groupID}`.
    create_group_if_not_exists_for => CreateGroupIfNotExistsFor;
    /// Params: `groupID`.
    delete_group => DeleteGroup;
    /// Params: `groupID`. Returns `{padIDs}`.
    list_pads => ListPads;
    /// Params: `groupID`, `padName`, optional `text`. Returns `{padID}`.
    create_group_pad => CreateGroupPad;
    /// Returns `{groupIDs}`.
    list_all_groups => ListAllGroups;

    // Authors
    /// Params: optional `name`. Returns `{authorID}`.
    create_author => CreateAuthor;
    /// Params: `authorMapper`, optional `name`. Returns `{authorID}`.
    create_author_if_not_exists_for => CreateAuthorIfNotExistsFor;
    /// Params: `authorID`. Returns `{padIDs}`.
    list_pads_of_author => ListPadsOfAuthor;
    /// Params: `authorID`.
    get_author_name => GetAuthorName;

    // Sessions
    /// Params: `groupID`, `authorID`, `validUntil` (unix seconds). Returns `{sessionID}`.
    create_session => CreateSession;
    /// Params: `sessionID`.
    delete_session => DeleteSession;
    /// Params: `sessionID`. Returns `{authorID, groupID, validUntil}`.
    get_session_info => GetSessionInfo;
    /// Params: `groupID`. Returns a map of session ID to session info.
    list_sessions_of_group => ListSessionsOfGroup;
    /// Params: `authorID`. Returns a map of session ID to session info.
    list_sessions_of_author => ListSessionsOfAuthor;

    // Pad content
    /// Params: `padID`, optional `rev`. Returns `{text}`.
    get_text => GetText;
    /// Params: `padID`, `text`.
    set_text => SetText;
    /// Params: `padID`, `text`.
    append_text => AppendText;
    /// Params: `padID`, optional `rev`. Returns `{html}`.
    get_html => GetHtml;
    /// Params: `padID`, `html`.
    set_html => SetHtml;
    /// Params: `padID`. Returns `{pool}`.
    get_attribute_pool => GetAttributePool;
    /// Params: `padID`, optional `rev`. Returns the changeset string.
    get_revision_changeset => GetRevisionChangeset;
    /// Params: `padID`, `startRev`, `endRev`. Returns `{html, authors}`.
    create_diff_html => CreateDiffHtml;
    /// Params: `padID`, `rev`.
    restore_revision => RestoreRevision;

    // Chat
    /// Params: `padID`, optional `start` and `end`. Returns `{messages}`.
    get_chat_history => GetChatHistory;
    /// Params: `padID`. Returns `{chatHead}`.
    get_chat_head => GetChatHead;
    /// Params: `padID`, `text`, `authorID`, optional `time`.
    append_chat_message => AppendChatMessage;

    // Pads
    /// Params: `padID`, optional `text`.
    create_pad => CreatePad;
    /// Params: `padID`. Returns `{revisions}`.
    get_revisions_count => GetRevisionsCount;
    /// Params: `padID`. Returns `{savedRevisions}`.
    get_saved_revisions_count => GetSavedRevisionsCount;
    /// Params: `padID`. Returns `{savedRevisions}` as a list.
    list_saved_revisions => ListSavedRevisions;
    /// Params: `padID`, optional `rev`.
    save_revision => SaveRevision;
    /// Params: `padID`. Returns `{padUsersCount}`.
    pad_users_count => PadUsersCount;
    /// Params: `padID`. Returns `{padUsers}`.
    pad_users => PadUsers;
    /// Params: `padID`.
    delete_pad => DeletePad;
    /// Params: `sourceID`, `destinationID`, optional `force`.
    copy_pad => CopyPad;
    /// Params: `sourceID`, `destinationID`, optional `force`.
    copy_pad_without_history => CopyPadWithoutHistory;
    /// Params: `sourceID`, `destinationID`, optional `force`.
    move_pad => MovePad;
    /// Params: `padID`. Returns `{readOnlyID}`.
    get_read_only_id => GetReadOnlyId;
    /// Params: `readOnlyID`. Returns `{padID}`.
    get_pad_id => GetPadId;
    /// Params: `padID`, `publicStatus`.
    set_public_status => SetPublicStatus;
    /// Params: `padID`. Returns `{publicStatus}`.
    get_public_status => GetPublicStatus;
    /// Params: `padID`, `password`.
    #[deprecated(note = "removed from current Etherpad releases")]
    set_password => SetPassword;
    /// Params: `padID`.
    #[deprecated(note = "removed from current Etherpad releases")]
    is_password_protected => IsPasswordProtected;
    /// Params: `padID`. Returns `{authorIDs}`.
    list_authors_of_pad => ListAuthorsOfPad;
    /// Params: `padID`. Returns `{lastEdited}`.
    get_last_edited => GetLastEdited;
    /// Params: `padID`, `msg`.
    send_clients_message => SendClientsMessage;
    check_token => CheckToken;
    /// Returns `{padIDs}`.
    list_all_pads => ListAllPads;

    // Global
    /// Returns `{totalPads, totalSessions, totalActivePads}`.
    get_stats => GetStats;
}
