use std::future::Future;

use eyre::Result;
use log::{debug, error};

/// Prefix marking a reply in the flattened comment list
pub const REPLY_PREFIX: &str = "    - ";

/// A top-level comment and the replies returned with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentThread {
    pub text: String,
    pub replies: Vec<String>,
}

/// One page of comment threads plus the token for the next page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPage {
    pub threads: Vec<CommentThread>,
    pub next_page_token: Option<String>,
}

/// Anything that can hand out comment threads one page at a time
pub trait CommentPageSource {
    /// Fetch the page identified by `page_token`, or the first page when `None`
    fn fetch_comment_page(&self, video_id: &str, page_token: Option<&str>) -> impl Future<Output = Result<CommentPage>>;
}

/// Page through every comment thread of a video and flatten it.
///
/// Each top-level comment is followed by its replies, prefixed with
/// [`REPLY_PREFIX`]. A failed request ends pagination: the error is reported on
/// stderr and whatever was collected up to that point is returned.
pub async fn collect_comments<S: CommentPageSource>(source: &S, video_id: &str) -> Vec<String> {
    let mut comments = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = match source.fetch_comment_page(video_id, page_token.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                error!("Comment listing for {video_id} failed after {pages} page(s): {e:#}");
                eprintln!("Failed to fetch comments: {e:#}");
                break;
            }
        };
        pages += 1;

        flatten_into(&mut comments, page.threads);

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    debug!("Collected {} comment lines over {pages} page(s)", comments.len());
    comments
}

fn flatten_into(out: &mut Vec<String>, threads: Vec<CommentThread>) {
    for thread in threads {
        out.push(thread.text);
        out.extend(thread.replies.into_iter().map(|reply| format!("{REPLY_PREFIX}{reply}")));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// Serves canned pages keyed by token; unknown tokens fail
    struct FakePages {
        pages: HashMap<Option<String>, CommentPage>,
        requested: RefCell<Vec<Option<String>>>,
    }

    impl FakePages {
        fn new(pages: Vec<(Option<&str>, CommentPage)>) -> Self {
            Self {
                pages: pages.into_iter().map(|(k, v)| (k.map(str::to_string), v)).collect(),
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommentPageSource for FakePages {
        async fn fetch_comment_page(&self, _video_id: &str, page_token: Option<&str>) -> Result<CommentPage> {
            let key = page_token.map(str::to_string);
            self.requested.borrow_mut().push(key.clone());
            self.pages
                .get(&key)
                .cloned()
                .ok_or_else(|| eyre::eyre!("403 Forbidden: commentsDisabled"))
        }
    }

    fn thread(text: &str, replies: &[&str]) -> CommentThread {
        CommentThread {
            text: text.to_string(),
            replies: replies.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_follows_page_tokens() {
        let source = FakePages::new(vec![
            (
                None,
                CommentPage {
                    threads: vec![thread("first", &["reply a", "reply b"])],
                    next_page_token: Some("p2".to_string()),
                },
            ),
            (
                Some("p2"),
                CommentPage {
                    threads: vec![thread("second", &[]), thread("third", &["reply c"])],
                    next_page_token: None,
                },
            ),
        ]);

        let comments = collect_comments(&source, "dQw4w9WgXcQ").await;
        assert_eq!(
            comments,
            vec!["first", "    - reply a", "    - reply b", "second", "third", "    - reply c"]
        );
        assert_eq!(*source.requested.borrow(), vec![None, Some("p2".to_string())]);
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_pages() {
        let source = FakePages::new(vec![(
            None,
            CommentPage {
                threads: vec![thread("kept", &[])],
                next_page_token: Some("missing".to_string()),
            },
        )]);

        let comments = collect_comments(&source, "dQw4w9WgXcQ").await;
        assert_eq!(comments, vec!["kept"]);
    }

    #[tokio::test]
    async fn test_failure_on_first_page_is_empty() {
        let source = FakePages::new(vec![]);
        assert!(collect_comments(&source, "dQw4w9WgXcQ").await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_video() {
        let source = FakePages::new(vec![(None, CommentPage::default())]);
        assert!(collect_comments(&source, "dQw4w9WgXcQ").await.is_empty());
    }
}
