//! Process-wide constants: platform identity, schema versions, federation
//! protocol identifiers, activity-stream vocabulary, and shared tier values.

use std::time::Duration;

// ============================================================================
// Platform
// ============================================================================

pub const PLATFORM_NAME: &str = "Fedibase";
pub const PLATFORM_VERSION: &str = "0.1.0";

/// Version of the DFRN protocol this build speaks.
pub const DFRN_PROTOCOL_VERSION: &str = "2.23";

// ============================================================================
// Schema versions
// ============================================================================

/// The database schema version this build of the software expects.
pub const DB_UPDATE_VERSION: i64 = 1284;

/// Oldest schema version a direct upgrade is supported from. Installations
/// below this must go through an intermediate release first.
pub const MIN_UPDATE_VERSION: i64 = 1170;

/// Lowest possible date time value stored in the database.
pub const NULL_DATE: &str = "0001-01-01 00:00:00";

// ============================================================================
// Federation protocols
// ============================================================================

/// Networks a contact can belong to.
///
/// The numeric group ids are used in stored permissions. Existing
/// allocations MUST NEVER BE CHANGED OR RE-ASSIGNED; only add to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Dfrn,
    Zot,
    OStatus,
    Feed,
    Diaspora,
    Mail,
    Facebook,
    LinkedIn,
    Xmpp,
    MySpace,
    GPlus,
    PumpIo,
    Twitter,
    Diaspora2,
    StatusNet,
    News,
    ICalendar,
    Pnut,
    /// Placeholder network for disabled contacts.
    Phantom,
}

impl Protocol {
    /// Permanent negative group id used in stored permissions.
    pub fn group_id(&self) -> i64 {
        match self {
            Self::Dfrn => -1,
            Self::Zot => -2,
            Self::OStatus => -3,
            Self::Feed => -4,
            Self::Diaspora => -5,
            Self::Mail => -6,
            Self::Facebook => -8,
            Self::LinkedIn => -9,
            Self::Xmpp => -10,
            Self::MySpace => -11,
            Self::GPlus => -12,
            Self::PumpIo => -13,
            Self::Twitter => -14,
            Self::Diaspora2 => -15,
            Self::StatusNet => -16,
            Self::News => -18,
            Self::ICalendar => -19,
            Self::Pnut => -20,
            Self::Phantom => -127,
        }
    }

    /// Short network tag stored in contact rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dfrn => "dfrn",
            Self::Zot => "zot!",
            Self::OStatus => "stat",
            Self::Feed => "feed",
            Self::Diaspora => "dspr",
            Self::Mail => "mail",
            Self::Facebook => "face",
            Self::LinkedIn => "lnkd",
            Self::Xmpp => "xmpp",
            Self::MySpace => "mysp",
            Self::GPlus => "goog",
            Self::PumpIo => "pump",
            Self::Twitter => "twit",
            Self::Diaspora2 => "dspc",
            Self::StatusNet => "stac",
            Self::News => "nntp",
            Self::ICalendar => "ical",
            Self::Pnut => "pnut",
            Self::Phantom => "unkn",
        }
    }
}

// ============================================================================
// XML namespaces
// ============================================================================

pub mod namespace {
    pub const ZOT: &str = "http://purl.org/zot";
    pub const DFRN: &str = "http://purl.org/macgirvin/dfrn/1.0";
    pub const THREAD: &str = "http://purl.org/syndication/thread/1.0";
    pub const TOMB: &str = "http://purl.org/atompub/tombstones/1.0";
    pub const ACTIVITY: &str = "http://activitystrea.ms/spec/1.0/";
    pub const ACTIVITY_SCHEMA: &str = "http://activitystrea.ms/schema/1.0/";
    pub const MEDIA: &str = "http://purl.org/syndication/atommedia";
    pub const SALMON_ME: &str = "http://salmon-protocol.org/ns/magic-env";
    pub const OSTATUS_SUB: &str = "http://ostatus.org/schema/1.0/subscribe";
    pub const GEORSS: &str = "http://www.georss.org/georss";
    pub const POCO: &str = "http://portablecontacts.net/spec/1.0";
    pub const FEED: &str = "http://schemas.google.com/g/2010#updates-from";
    pub const OSTATUS: &str = "http://ostatus.org/schema/1.0";
    pub const STATUSNET: &str = "http://status.net/schema/api/1/";
    pub const ATOM1: &str = "http://www.w3.org/2005/Atom";
    pub const MASTODON: &str = "http://mastodon.social/schema/1.0";
}

// ============================================================================
// Activity stream vocabulary
// ============================================================================

pub mod activity {
    pub const LIKE: &str = "http://activitystrea.ms/schema/1.0/like";
    pub const DISLIKE: &str = "http://purl.org/macgirvin/dfrn/1.0/dislike";
    pub const ATTEND: &str = "http://purl.org/zot/activity/attendyes";
    pub const ATTEND_NO: &str = "http://purl.org/zot/activity/attendno";
    pub const ATTEND_MAYBE: &str = "http://purl.org/zot/activity/attendmaybe";

    pub const FRIEND: &str = "http://activitystrea.ms/schema/1.0/make-friend";
    pub const REQ_FRIEND: &str = "http://activitystrea.ms/schema/1.0/request-friend";
    pub const UNFRIEND: &str = "http://activitystrea.ms/schema/1.0/remove-friend";
    pub const FOLLOW: &str = "http://activitystrea.ms/schema/1.0/follow";
    pub const UNFOLLOW: &str = "http://activitystrea.ms/schema/1.0/stop-following";
    pub const JOIN: &str = "http://activitystrea.ms/schema/1.0/join";

    pub const POST: &str = "http://activitystrea.ms/schema/1.0/post";
    pub const UPDATE: &str = "http://activitystrea.ms/schema/1.0/update";
    pub const TAG: &str = "http://activitystrea.ms/schema/1.0/tag";
    pub const FAVORITE: &str = "http://activitystrea.ms/schema/1.0/favorite";
    pub const UNFAVORITE: &str = "http://activitystrea.ms/schema/1.0/unfavorite";
    pub const SHARE: &str = "http://activitystrea.ms/schema/1.0/share";
    pub const DELETE: &str = "http://activitystrea.ms/schema/1.0/delete";
    pub const POKE: &str = "http://purl.org/zot/activity/poke";

    pub const OBJ_HEART: &str = "http://purl.org/macgirvin/dfrn/1.0/heart";
    pub const OBJ_BOOKMARK: &str = "http://activitystrea.ms/schema/1.0/bookmark";
    pub const OBJ_COMMENT: &str = "http://activitystrea.ms/schema/1.0/comment";
    pub const OBJ_NOTE: &str = "http://activitystrea.ms/schema/1.0/note";
    pub const OBJ_PERSON: &str = "http://activitystrea.ms/schema/1.0/person";
    pub const OBJ_IMAGE: &str = "http://activitystrea.ms/schema/1.0/image";
    pub const OBJ_PHOTO: &str = "http://activitystrea.ms/schema/1.0/photo";
    pub const OBJ_VIDEO: &str = "http://activitystrea.ms/schema/1.0/video";
    pub const OBJ_PROFILE_PHOTO: &str = "http://activitystrea.ms/schema/1.0/profile-photo";
    pub const OBJ_ALBUM: &str = "http://activitystrea.ms/schema/1.0/photo-album";
    pub const OBJ_EVENT: &str = "http://activitystrea.ms/schema/1.0/event";
    pub const OBJ_GROUP: &str = "http://activitystrea.ms/schema/1.0/group";
    pub const OBJ_TAGTERM: &str = "http://purl.org/macgirvin/dfrn/1.0/tagterm";
    pub const OBJ_PROFILE: &str = "http://purl.org/macgirvin/dfrn/1.0/profile";
    pub const OBJ_QUESTION: &str = "http://activityschema.org/object/question";
}

// ============================================================================
// Cache TTL tiers
// ============================================================================

pub mod cache {
    use super::Duration;

    pub const MONTH: Duration = Duration::from_secs(2_592_000);
    pub const WEEK: Duration = Duration::from_secs(604_800);
    pub const DAY: Duration = Duration::from_secs(86_400);
    pub const HOUR: Duration = Duration::from_secs(3_600);
    pub const HALF_HOUR: Duration = Duration::from_secs(1_800);
    pub const QUARTER_HOUR: Duration = Duration::from_secs(900);
    pub const FIVE_MINUTES: Duration = Duration::from_secs(300);
    pub const MINUTE: Duration = Duration::from_secs(60);
}

// ============================================================================
// Site policies
// ============================================================================

/// Registration policy of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterPolicy {
    #[default]
    Closed = 0,
    Approve = 1,
    Open = 2,
}

/// SSL redirection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslPolicy {
    #[default]
    None = 0,
    Full = 1,
    SelfSign = 2,
}

/// Item weight for query ordering.
pub mod gravity {
    pub const PARENT: i32 = 0;
    pub const ACTIVITY: i32 = 3;
    pub const COMMENT: i32 = 6;
    pub const UNKNOWN: i32 = 9;
}

/// Email notification option bits.
pub mod notify {
    pub const INTRO: u32 = 0x0001;
    pub const CONFIRM: u32 = 0x0002;
    pub const WALL: u32 = 0x0004;
    pub const COMMENT: u32 = 0x0008;
    pub const MAIL: u32 = 0x0010;
    pub const SUGGEST: u32 = 0x0020;
    pub const PROFILE: u32 = 0x0040;
    pub const TAG_SELF: u32 = 0x0080;
    pub const TAG_SHARE: u32 = 0x0100;
    pub const POKE: u32 = 0x0200;
    pub const SHARE: u32 = 0x0400;
    pub const SYSTEM_EMAIL: u32 = 0x4000;
    pub const SYSTEM: u32 = 0x8000;
}

/// Maximum number of likers listed by name on an item.
pub const MAX_LIKERS: usize = 75;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_group_ids_are_stable() {
        assert_eq!(Protocol::Dfrn.group_id(), -1);
        assert_eq!(Protocol::Diaspora.group_id(), -5);
        assert_eq!(Protocol::Pnut.group_id(), -20);
        assert_eq!(Protocol::Phantom.group_id(), -127);
    }

    #[test]
    fn test_protocol_group_ids_are_unique() {
        let all = [
            Protocol::Dfrn,
            Protocol::Zot,
            Protocol::OStatus,
            Protocol::Feed,
            Protocol::Diaspora,
            Protocol::Mail,
            Protocol::Facebook,
            Protocol::LinkedIn,
            Protocol::Xmpp,
            Protocol::MySpace,
            Protocol::GPlus,
            Protocol::PumpIo,
            Protocol::Twitter,
            Protocol::Diaspora2,
            Protocol::StatusNet,
            Protocol::News,
            Protocol::ICalendar,
            Protocol::Pnut,
            Protocol::Phantom,
        ];
        let mut ids: Vec<i64> = all.iter().map(|p| p.group_id()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all.len());
    }

    #[test]
    fn test_activity_verbs_use_schema_namespace() {
        assert!(activity::LIKE.starts_with(namespace::ACTIVITY_SCHEMA));
        assert!(activity::FOLLOW.starts_with(namespace::ACTIVITY_SCHEMA));
        assert!(activity::DISLIKE.starts_with(namespace::DFRN));
    }

    #[test]
    fn test_cache_tiers_are_ordered() {
        assert!(cache::MONTH > cache::WEEK);
        assert!(cache::WEEK > cache::DAY);
        assert!(cache::DAY > cache::HOUR);
        assert!(cache::HOUR > cache::MINUTE);
    }

    #[test]
    fn test_update_version_window() {
        assert!(MIN_UPDATE_VERSION < DB_UPDATE_VERSION);
    }
}
