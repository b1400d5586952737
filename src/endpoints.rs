//! Static Web API endpoint catalog and classification tables.
//!
//! Method names are the API method with dots replaced by underscores
//! (`conversations.history` becomes `conversations_history`).
//!
//! The two classification tables are maintained by hand:
//!
//! - [`PAGINATED_FIELDS`]: cursor-paginated endpoints and the response
//!   field holding their items. Classic page-number endpoints (`files.list`,
//!   `search.*`) are deliberately absent.
//! - [`CACHEABLE_ENDPOINTS`]: reads that are safe to memoize. Derived
//!   offline from the GET endpoints, minus those with side effects
//!   (`auth.revoke`, `dnd.setSnooze`, ...) or whose result is meant to be
//!   fresh on every call (`conversations.history`, `rtm.connect`).

use serde_json::Value;

use crate::Error;
use crate::client::API_CALL;
use crate::method::{Method, method};
use crate::registry::{ClientLayer, ClientType};
use crate::transport::{ApiRequest, HttpVerb};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://slack.com/api/";

/// A Web API endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// API method, e.g. `conversations.history`
    pub api_method: &'static str,
    /// HTTP verb
    pub http_verb: HttpVerb,
}

impl Endpoint {
    const fn get(api_method: &'static str) -> Self {
        Self {
            api_method,
            http_verb: HttpVerb::Get,
        }
    }

    const fn post(api_method: &'static str) -> Self {
        Self {
            api_method,
            http_verb: HttpVerb::Post,
        }
    }

    /// Client method name
    #[must_use]
    pub fn name(&self) -> String {
        self.api_method.replace('.', "_")
    }
}

/// Every endpoint the web client exposes
pub static ENDPOINTS: &[Endpoint] = &[
    Endpoint::get("admin.apps.approved.list"),
    Endpoint::get("admin.apps.requests.list"),
    Endpoint::get("admin.apps.restricted.list"),
    Endpoint::post("admin.apps.approve"),
    Endpoint::post("admin.apps.restrict"),
    Endpoint::get("admin.barriers.list"),
    Endpoint::get("admin.conversations.restrictAccess.listGroups"),
    Endpoint::get("admin.emoji.list"),
    Endpoint::get("admin.emoji.rename"),
    Endpoint::get("admin.teams.admins.list"),
    Endpoint::get("admin.teams.owners.list"),
    Endpoint::get("admin.teams.settings.setDefaultChannels"),
    Endpoint::get("admin.teams.settings.setIcon"),
    Endpoint::post("api.test"),
    Endpoint::get("auth.revoke"),
    Endpoint::post("auth.test"),
    Endpoint::get("bookmarks.list"),
    Endpoint::get("bots.info"),
    Endpoint::post("chat.delete"),
    Endpoint::get("chat.getPermalink"),
    Endpoint::post("chat.meMessage"),
    Endpoint::post("chat.postEphemeral"),
    Endpoint::post("chat.postMessage"),
    Endpoint::post("chat.scheduleMessage"),
    Endpoint::post("chat.update"),
    Endpoint::post("conversations.archive"),
    Endpoint::post("conversations.close"),
    Endpoint::post("conversations.create"),
    Endpoint::get("conversations.declineSharedInvite"),
    Endpoint::get("conversations.history"),
    Endpoint::get("conversations.info"),
    Endpoint::post("conversations.invite"),
    Endpoint::post("conversations.join"),
    Endpoint::post("conversations.kick"),
    Endpoint::post("conversations.leave"),
    Endpoint::get("conversations.list"),
    Endpoint::post("conversations.mark"),
    Endpoint::get("conversations.members"),
    Endpoint::post("conversations.open"),
    Endpoint::post("conversations.rename"),
    Endpoint::get("conversations.replies"),
    Endpoint::post("conversations.setPurpose"),
    Endpoint::post("conversations.setTopic"),
    Endpoint::post("conversations.unarchive"),
    Endpoint::post("dnd.endDnd"),
    Endpoint::post("dnd.endSnooze"),
    Endpoint::get("dnd.info"),
    Endpoint::get("dnd.setSnooze"),
    Endpoint::get("dnd.teamInfo"),
    Endpoint::get("emoji.list"),
    Endpoint::post("files.delete"),
    Endpoint::get("files.info"),
    Endpoint::get("files.list"),
    Endpoint::get("files.remote.info"),
    Endpoint::get("files.remote.list"),
    Endpoint::get("files.remote.share"),
    Endpoint::get("migration.exchange"),
    Endpoint::post("pins.add"),
    Endpoint::get("pins.list"),
    Endpoint::post("pins.remove"),
    Endpoint::post("reactions.add"),
    Endpoint::get("reactions.get"),
    Endpoint::get("reactions.list"),
    Endpoint::post("reactions.remove"),
    Endpoint::post("reminders.add"),
    Endpoint::post("reminders.complete"),
    Endpoint::post("reminders.delete"),
    Endpoint::get("reminders.info"),
    Endpoint::get("reminders.list"),
    Endpoint::get("rtm.connect"),
    Endpoint::get("search.all"),
    Endpoint::get("search.files"),
    Endpoint::get("search.messages"),
    Endpoint::post("stars.add"),
    Endpoint::get("stars.list"),
    Endpoint::post("stars.remove"),
    Endpoint::get("team.accessLogs"),
    Endpoint::get("team.billableInfo"),
    Endpoint::get("team.info"),
    Endpoint::get("team.integrationLogs"),
    Endpoint::get("team.profile.get"),
    Endpoint::post("usergroups.create"),
    Endpoint::get("usergroups.list"),
    Endpoint::post("usergroups.update"),
    Endpoint::get("usergroups.users.list"),
    Endpoint::post("usergroups.users.update"),
    Endpoint::get("users.conversations"),
    Endpoint::get("users.deletePhoto"),
    Endpoint::get("users.getPresence"),
    Endpoint::get("users.identity"),
    Endpoint::get("users.info"),
    Endpoint::get("users.list"),
    Endpoint::get("users.lookupByEmail"),
    Endpoint::get("users.profile.get"),
    Endpoint::post("users.profile.set"),
    Endpoint::post("users.setPresence"),
    Endpoint::post("views.open"),
    Endpoint::post("views.publish"),
    Endpoint::post("views.push"),
    Endpoint::post("views.update"),
];

/// Cursor-paginated endpoints and their result field
pub static PAGINATED_FIELDS: &[(&str, &str)] = &[
    ("admin_apps_approved_list", "approved_apps"),
    ("admin_apps_requests_list", "app_requests"),
    ("admin_apps_restricted_list", "restricted_apps"),
    ("admin_teams_admins_list", "admin_ids"),
    ("admin_teams_owners_list", "owner_ids"),
    ("conversations_history", "messages"),
    ("conversations_list", "channels"),
    ("conversations_members", "members"),
    ("conversations_replies", "messages"),
    ("files_remote_list", "files"),
    ("reactions_list", "items"),
    ("stars_list", "items"),
    ("usergroups_users_list", "users"),
    ("users_conversations", "channels"),
    ("users_list", "members"),
];

/// Side-effect-free reads eligible for memoization
pub static CACHEABLE_ENDPOINTS: &[&str] = &[
    "admin_apps_approved_list",
    "admin_apps_requests_list",
    "admin_apps_restricted_list",
    "admin_barriers_list",
    "admin_conversations_restrictAccess_listGroups",
    "admin_emoji_list",
    "admin_teams_admins_list",
    "admin_teams_owners_list",
    "bots_info",
    "chat_getPermalink",
    "conversations_info",
    "conversations_list",
    "conversations_members",
    "conversations_replies",
    "dnd_info",
    "dnd_teamInfo",
    "emoji_list",
    "files_info",
    "files_list",
    "files_remote_info",
    "files_remote_list",
    "migration_exchange",
    "pins_list",
    "reactions_get",
    "reactions_list",
    "reminders_info",
    "reminders_list",
    "search_all",
    "search_files",
    "search_messages",
    "stars_list",
    "team_accessLogs",
    "team_billableInfo",
    "team_info",
    "team_integrationLogs",
    "team_profile_get",
    "usergroups_list",
    "usergroups_users_list",
    "users_conversations",
    "users_getPresence",
    "users_identity",
    "users_info",
    "users_list",
    "users_lookupByEmail",
    "users_profile_get",
];

/// Look up a catalog endpoint by client method name
#[must_use]
pub fn find(name: &str) -> Option<&'static Endpoint> {
    ENDPOINTS.iter().find(|e| e.name() == name)
}

fn endpoint_method(endpoint: Endpoint) -> Method {
    method(move |client, args| {
        if !args.positional.is_empty() {
            return Err(Error::InvalidArguments(format!(
                "{} takes keyword arguments only",
                endpoint.name()
            )));
        }
        client.api_call(endpoint.api_method, endpoint.http_verb, args.keyword_object())
    })
}

fn dispatch_method() -> Method {
    method(|client, args| {
        let request = ApiRequest::from_args(&args)?;
        client.base().dispatch(&request)
    })
}

impl ClientType {
    /// The Web API client: a `BaseClient` layer holding `api_call` under a
    /// `WebClient` layer with one method per catalog endpoint.
    #[must_use]
    pub fn web() -> Self {
        let base = ClientLayer::new("BaseClient")
            .method(API_CALL, dispatch_method())
            .attribute("BASE_URL", Value::from(DEFAULT_BASE_URL));

        let web = ENDPOINTS
            .iter()
            .fold(ClientLayer::new("WebClient"), |layer, endpoint| {
                layer.method(endpoint.name(), endpoint_method(*endpoint))
            });

        ClientType::new("SlackClient").extend(base).extend(web)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::collect_base_methods;
    use std::collections::HashSet;

    #[test]
    fn names_replace_dots() {
        assert_eq!(
            Endpoint::get("admin.conversations.restrictAccess.listGroups").name(),
            "admin_conversations_restrictAccess_listGroups"
        );
    }

    #[test]
    fn catalog_has_no_duplicates() {
        let names: HashSet<String> = ENDPOINTS.iter().map(Endpoint::name).collect();
        assert_eq!(names.len(), ENDPOINTS.len());
    }

    #[test]
    fn classification_tables_reference_catalog_endpoints() {
        for (name, _) in PAGINATED_FIELDS {
            assert!(find(name).is_some(), "paginated endpoint {name} not in catalog");
        }
        for name in CACHEABLE_ENDPOINTS {
            assert!(find(name).is_some(), "cacheable endpoint {name} not in catalog");
        }
    }

    #[test]
    fn cacheable_endpoints_are_reads() {
        for name in CACHEABLE_ENDPOINTS {
            assert_eq!(find(name).unwrap().http_verb, HttpVerb::Get, "{name}");
        }
    }

    #[test]
    fn web_type_exposes_dispatch_and_every_endpoint() {
        let methods = collect_base_methods(&ClientType::web());
        assert!(methods.contains(API_CALL));
        assert_eq!(methods.len(), ENDPOINTS.len() + 1);
        assert!(!methods.contains("BASE_URL"));
    }
}
