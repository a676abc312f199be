use serde::{Deserialize, Serialize};

/// Channel snapshot shown in the channel header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub username: String,
    pub title: String,
    pub viewers: u64,
    pub category: String,
    pub is_live: bool,
    /// Pusher subscription handle. May be present while offline.
    pub chatroom_id: Option<u64>,
    /// Numeric Kick user id of the channel owner.
    pub user_id: Option<u64>,
}

/// Raw `GET /channels/{slug}` response. Only the fields used are modelled.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChannelResponse {
    #[serde(default)]
    pub user_id: Option<u64>,
    /// Kept raw: an empty object means offline, same as `null`.
    #[serde(default)]
    pub livestream: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub chatroom: Option<Chatroom>,
    #[serde(default)]
    pub user: Option<ChannelUser>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Livestream {
    #[serde(default)]
    pub session_title: Option<String>,
    #[serde(default)]
    pub viewer_count: Option<u64>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Category {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Chatroom {
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChannelUser {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
}

impl ChannelResponse {
    pub(crate) fn into_info(self, slug: &str) -> ChannelInfo {
        let username = self
            .user
            .as_ref()
            .and_then(|u| u.username.clone())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| slug.to_string());
        let user_id = self.user_id.or_else(|| self.user.as_ref().and_then(|u| u.id));
        let chatroom_id = self.chatroom.and_then(|c| c.id);

        let livestream = self
            .livestream
            .filter(|fields| !fields.is_empty())
            .map(|fields| {
                serde_json::from_value::<Livestream>(serde_json::Value::Object(fields))
                    .unwrap_or_default()
            });

        match livestream {
            Some(live) => ChannelInfo {
                username,
                title: live.session_title.unwrap_or_else(|| "N/A".into()),
                viewers: live.viewer_count.unwrap_or(0),
                category: live
                    .categories
                    .into_iter()
                    .next()
                    .and_then(|c| c.name)
                    .unwrap_or_else(|| "N/A".into()),
                is_live: true,
                chatroom_id,
                user_id,
            },
            None => ChannelInfo {
                username,
                title: "Offline".into(),
                viewers: 0,
                category: "N/A".into(),
                is_live: false,
                chatroom_id,
                user_id,
            },
        }
    }
}
