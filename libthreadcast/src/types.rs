//! Core types for Threadcast

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Contents of the posts file
///
/// Two shapes are accepted. A bare JSON array of strings is a list of
/// independent posts, published in file order. An object with a `threads`
/// array holds scheduled threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostsDocument {
    Posts(Vec<String>),
    Threads(ThreadsDocument),
}

impl PostsDocument {
    /// Every text in the document, in publishing order
    pub fn texts(&self) -> Vec<&str> {
        match self {
            PostsDocument::Posts(posts) => posts.iter().map(String::as_str).collect(),
            PostsDocument::Threads(doc) => doc
                .threads
                .iter()
                .flat_map(|thread| thread.tweets.iter().map(|tweet| tweet.text.as_str()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadsDocument {
    /// Required, so that an arbitrary object is not mistaken for an empty document
    pub threads: Vec<Thread>,

    /// Unrecognised top-level keys, written back untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An ordered group of tweets published together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Local time in the configured zone, `YYYY-MM-DD HH:MM:SS`; absent means now
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,

    pub tweets: Vec<TweetDraft>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Thread {
    pub fn new(tweets: Vec<TweetDraft>) -> Self {
        Self {
            scheduled_time: None,
            tweets,
            extra: Map::new(),
        }
    }

    pub fn scheduled_at(mut self, time: &str) -> Self {
        self.scheduled_time = Some(time.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetDraft {
    pub text: String,

    #[serde(default)]
    pub reply_to_id: ReplyTarget,
}

impl TweetDraft {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            reply_to_id: ReplyTarget::None,
        }
    }

    pub fn replying_to(mut self, target: ReplyTarget) -> Self {
        self.reply_to_id = target;
        self
    }
}

/// What a tweet replies to
///
/// Stored in JSON as `null`, the literal `"previous"`, or a tweet id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum ReplyTarget {
    #[default]
    None,
    /// The tweet published just before this one in the same thread
    Previous,
    Tweet(String),
}

const PREVIOUS: &str = "previous";

impl From<Option<String>> for ReplyTarget {
    fn from(value: Option<String>) -> Self {
        match value {
            None => ReplyTarget::None,
            Some(id) if id.trim().is_empty() => ReplyTarget::None,
            Some(id) if id == PREVIOUS => ReplyTarget::Previous,
            Some(id) => ReplyTarget::Tweet(id),
        }
    }
}

impl From<ReplyTarget> for Option<String> {
    fn from(value: ReplyTarget) -> Self {
        match value {
            ReplyTarget::None => None,
            ReplyTarget::Previous => Some(PREVIOUS.to_string()),
            ReplyTarget::Tweet(id) => Some(id),
        }
    }
}

impl ReplyTarget {
    /// Resolve against the id of the tweet published just before
    pub fn resolve<'a>(&'a self, previous: Option<&'a str>) -> Option<&'a str> {
        match self {
            ReplyTarget::None => None,
            ReplyTarget::Previous => previous,
            ReplyTarget::Tweet(id) => Some(id.as_str()),
        }
    }
}

/// A thread as recorded in the archive file once published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedThread {
    #[serde(flatten)]
    pub thread: Thread,

    /// Ids returned by the platform, one per tweet
    #[serde(default)]
    pub posted_ids: Vec<String>,

    /// Unix timestamp of the last tweet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<i64>,
}

impl ArchivedThread {
    pub fn new(thread: Thread, posted_ids: Vec<String>) -> Self {
        Self {
            thread,
            posted_ids,
            posted_at: Some(chrono::Utc::now().timestamp()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDocument {
    #[serde(default)]
    pub threads: Vec<ArchivedThread>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_list_parses_as_posts() {
        let doc: PostsDocument = serde_json::from_str(r#"["one", "two", "three"]"#).unwrap();
        assert_eq!(doc.texts(), vec!["one", "two", "three"]);
        assert!(matches!(doc, PostsDocument::Posts(_)));
    }

    #[test]
    fn test_empty_list_parses_as_posts() {
        let doc: PostsDocument = serde_json::from_str("[]").unwrap();
        assert_eq!(doc, PostsDocument::Posts(vec![]));
    }

    #[test]
    fn test_thread_document_parses() {
        let doc: PostsDocument = serde_json::from_str(
            r#"{
                "threads": [
                    {
                        "scheduled_time": "2025-02-01 09:30:00",
                        "tweets": [
                            {"text": "first", "reply_to_id": null},
                            {"text": "second", "reply_to_id": "previous"},
                            {"text": "aside", "reply_to_id": "1850000000000000000"},
                            {"text": "no key"}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        let PostsDocument::Threads(doc) = doc else {
            panic!("expected thread document");
        };
        let thread = &doc.threads[0];
        assert_eq!(thread.scheduled_time.as_deref(), Some("2025-02-01 09:30:00"));
        assert_eq!(thread.tweets[0].reply_to_id, ReplyTarget::None);
        assert_eq!(thread.tweets[1].reply_to_id, ReplyTarget::Previous);
        assert_eq!(
            thread.tweets[2].reply_to_id,
            ReplyTarget::Tweet("1850000000000000000".to_string())
        );
        assert_eq!(thread.tweets[3].reply_to_id, ReplyTarget::None);
    }

    #[test]
    fn test_list_of_non_strings_is_rejected() {
        assert!(serde_json::from_str::<PostsDocument>(r#"[1, 2]"#).is_err());
        assert!(serde_json::from_str::<PostsDocument>(r#""just text""#).is_err());
    }

    #[test]
    fn test_object_without_threads_key_is_rejected() {
        let misspelled = r#"{"thraeds": [{"tweets": [{"text": "a"}]}]}"#;
        assert!(serde_json::from_str::<PostsDocument>(misspelled).is_err());

        let credentials = r#"{"api_key": "x", "api_secret_key": "y"}"#;
        assert!(serde_json::from_str::<PostsDocument>(credentials).is_err());

        let empty: PostsDocument = serde_json::from_str(r#"{"threads": []}"#).unwrap();
        assert_eq!(empty.texts().len(), 0);
    }

    #[test]
    fn test_unknown_fields_survive_rewrite() {
        let input = r#"{"threads":[{"tweets":[{"text":"a"}],"topic":"launch"}],"owner":"ops"}"#;
        let doc: ThreadsDocument = serde_json::from_str(input).unwrap();
        let output = serde_json::to_value(&doc).unwrap();

        assert_eq!(output["owner"], "ops");
        assert_eq!(output["threads"][0]["topic"], "launch");
        assert!(output["threads"][0].get("scheduled_time").is_none());
    }

    #[test]
    fn test_reply_target_serializes_back_to_original_form() {
        let tweet = TweetDraft::new("x").replying_to(ReplyTarget::Previous);
        let value = serde_json::to_value(&tweet).unwrap();
        assert_eq!(value["reply_to_id"], "previous");

        let value = serde_json::to_value(TweetDraft::new("y")).unwrap();
        assert!(value["reply_to_id"].is_null());
    }

    #[test]
    fn test_reply_target_resolution() {
        assert_eq!(ReplyTarget::None.resolve(Some("1")), None);
        assert_eq!(ReplyTarget::Previous.resolve(Some("1")), Some("1"));
        assert_eq!(ReplyTarget::Previous.resolve(None), None);
        assert_eq!(ReplyTarget::Tweet("9".to_string()).resolve(Some("1")), Some("9"));
    }

    #[test]
    fn test_archived_thread_flattens_thread_fields() {
        let archived = ArchivedThread::new(
            Thread::new(vec![TweetDraft::new("hello")]).scheduled_at("2025-02-01 09:30:00"),
            vec!["42".to_string()],
        );
        let value = serde_json::to_value(&archived).unwrap();
        assert_eq!(value["scheduled_time"], "2025-02-01 09:30:00");
        assert_eq!(value["tweets"][0]["text"], "hello");
        assert_eq!(value["posted_ids"][0], "42");
        assert!(value["posted_at"].is_i64());
    }
}
